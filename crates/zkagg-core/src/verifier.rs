//! Verifier façade: resolve the artifact set for a proof's fork/version and
//! delegate to the backend.
//!
//! Outcomes are three-way:
//! - `Ok(true)`: the proof checks under the requested context.
//! - `Ok(false)`: the proof is well-formed but does not check (wrong level,
//!   produced under another context, public input not matching its fields,
//!   backend rejects it).
//! - `Err(_)`: the proof could not be evaluated (level uninitialized, fork or
//!   version not loaded, undecodable input, backend failure).

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::artifact::Proof;
use crate::backend::ProofBackend;
use crate::binding::expected_public_input;
use crate::error::{Error, Result};
use crate::registry::{ArtifactRegistry, ArtifactSet, Role};
use crate::types::{ProofLevel, VersionContext};

/// Verifier over backend `B`, holding its own verifier-role registry.
pub struct Verifier<B: ProofBackend> {
    registry: ArtifactRegistry,
    backend: PhantomData<fn() -> B>,
}

impl<B: ProofBackend> Default for Verifier<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ProofBackend> std::fmt::Debug for Verifier<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("backend", &B::NAME)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<B: ProofBackend> Verifier<B> {
    /// Verifier with an empty registry; every level starts `Uninitialized`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ArtifactRegistry::new(Role::Verifier),
            backend: PhantomData,
        }
    }

    /// Underlying registry (for injection of in-memory artifact sets).
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Load `level` verifier artifacts for `context` from disk.
    pub fn init(
        &self,
        level: ProofLevel,
        context: VersionContext,
        params_dir: &Path,
        assets_dir: &Path,
    ) -> Result<Arc<ArtifactSet>> {
        self.registry.initialize(level, context, params_dir, assets_dir)
    }

    /// Verify a chunk proof.
    pub fn verify_chunk(
        &self,
        proof: &Proof,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.verify(ProofLevel::Chunk, proof, fork_name, circuit_version)
    }

    /// Verify a batch proof.
    pub fn verify_batch(
        &self,
        proof: &Proof,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.verify(ProofLevel::Batch, proof, fork_name, circuit_version)
    }

    /// Verify a bundle proof. Fork and version may be omitted while the
    /// bundle level is registered fork-invariant.
    pub fn verify_bundle(
        &self,
        proof: &Proof,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.verify(ProofLevel::Bundle, proof, fork_name, circuit_version)
    }

    /// Decode `bytes` as a JSON [`Proof`] and verify it at `level`.
    ///
    /// The level guard runs before decoding, so an uninitialized level is
    /// reported as such whatever the input.
    pub fn verify_json(
        &self,
        level: ProofLevel,
        bytes: &[u8],
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.registry.ensure_ready(level)?;
        let proof = Proof::from_json(bytes)?;
        self.verify(level, &proof, fork_name, circuit_version)
    }

    /// Verify `proof` as a `level` proof under the requested fork/version.
    pub fn verify(
        &self,
        level: ProofLevel,
        proof: &Proof,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.registry.ensure_ready(level)?;
        let set = self.registry.resolve(level, fork_name, circuit_version)?;
        proof.sanity_check()?;

        if let Err(reason) = envelope_checks(level, proof, Some(set.context()), set.vk()) {
            warn!(%level, context = %set.context(), %reason, "proof rejected");
            return Ok(false);
        }

        let ok = B::verify(&set, level, &proof.public_input, proof.bytes()).map_err(Error::Backend)?;
        debug!(%level, context = %set.context(), ok, "verified proof");
        Ok(ok)
    }

    /// Verifying key of the `level` artifact set resolved for `fork`/`version`.
    pub fn vk(
        &self,
        level: ProofLevel,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Vec<u8>> {
        Ok(self
            .registry
            .resolve(level, fork_name, circuit_version)?
            .vk()
            .to_vec())
    }
}

/// Envelope checks shared by [`Verifier::verify`] and the aggregators' input
/// checks: level, context, verifying key, public input, chunk transition.
///
/// `context` is `None` when the caller accepts any context (a fork-invariant
/// aggregator over per-fork inputs); the key still pins the producer.
pub(crate) fn envelope_checks(
    level: ProofLevel,
    proof: &Proof,
    context: Option<&VersionContext>,
    vk: &[u8],
) -> std::result::Result<(), String> {
    if proof.level != level {
        return Err(format!("expected a {level} proof, got {}", proof.level));
    }
    if let Some(ctx) = context {
        if &proof.context != ctx {
            return Err(format!("produced under {}, expected {ctx}", proof.context));
        }
    }
    if proof.vk != vk {
        return Err("verifying key mismatch".into());
    }
    if expected_public_input(proof) != Some(proof.public_input) {
        return Err("public input does not match the proof's fields".into());
    }
    if let Some(info) = &proof.chunk_info {
        if info.transition() != proof.transition {
            return Err("chunk info transition disagrees with the proof transition".into());
        }
    }
    Ok(())
}
