//! Prover façade: chunk proving plus batch and bundle aggregation.
//!
//! Every prove path:
//! 1. guards the level (`Uninitialized` is a configuration error whatever the input),
//! 2. resolves the artifact set,
//! 3. runs the structural checks for the level,
//! 4. hands a [`Witness`] to the backend,
//! 5. wraps the bytes into a [`Proof`] carrying the set's context and key.
//!
//! Batch aggregation checks, in order: list sizes, bounds, order against the
//! header, chunk-info binding of each proof, state-root continuity, then an
//! independent re-verification of every chunk proof ([`Prover::check_chunk_proofs`]).
//! The first failure aborts with the offending index.
//!
//! A prove call only reads the registry; an abandoned call leaves no
//! partial state behind.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::artifact::Proof;
use crate::backend::{ProofBackend, Witness};
use crate::binding::{batch_public_input, bundle_batches_commitment, bundle_public_input};
use crate::chunk_info::ChunkInfo;
use crate::config::ServiceOptions;
use crate::error::{ConfigurationError, Error, MalformedInputError, Result};
use crate::io::dump_proof;
use crate::registry::{ArtifactRegistry, ArtifactSet, Role};
use crate::types::{BatchHeader, BlockTrace, ProofLevel, StateTransition, VersionContext, H256};
use crate::verifier::envelope_checks;

/// Upper bound on chunks aggregated into one batch.
pub const MAX_AGG_CHUNKS: usize = 45;

/// Prover over backend `B`, holding its own prover-role registry.
pub struct Prover<B: ProofBackend> {
    registry: ArtifactRegistry,
    options: ServiceOptions,
    backend: PhantomData<fn() -> B>,
}

impl<B: ProofBackend> Default for Prover<B> {
    fn default() -> Self {
        Self::new(ServiceOptions::default())
    }
}

impl<B: ProofBackend> std::fmt::Debug for Prover<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prover")
            .field("backend", &B::NAME)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Context an aggregator's inputs must carry: its own, unless it is
/// fork-invariant and takes inputs from whichever fork its child key belongs to.
fn child_context(set: &ArtifactSet) -> Option<&VersionContext> {
    let ctx = set.context();
    (ctx != &VersionContext::default()).then_some(ctx)
}

impl<B: ProofBackend> Prover<B> {
    /// Prover with an empty registry.
    #[must_use]
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            registry: ArtifactRegistry::new(Role::Prover),
            options,
            backend: PhantomData,
        }
    }

    /// Underlying registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Options in effect.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Load `level` prover artifacts for `context` from disk.
    pub fn init(
        &self,
        level: ProofLevel,
        context: VersionContext,
        params_dir: &Path,
        assets_dir: &Path,
    ) -> Result<Arc<ArtifactSet>> {
        self.registry.initialize(level, context, params_dir, assets_dir)
    }

    /// The artifact set `level` proves with when no fork is named: the only one loaded.
    pub fn active(&self, level: ProofLevel) -> Result<Arc<ArtifactSet>> {
        self.registry.ensure_ready(level)?;
        let mut sets = self.registry.loaded(level);
        if sets.len() == 1 {
            if let Some(set) = sets.pop() {
                return Ok(set);
            }
        }
        Err(ConfigurationError::InvalidConfig(format!(
            "{} {level} prover artifact sets are loaded; name the fork to prove for",
            sets.len()
        ))
        .into())
    }

    fn select(
        &self,
        level: ProofLevel,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Arc<ArtifactSet>> {
        if fork_name.is_none() && circuit_version.is_none() {
            self.active(level)
        } else {
            self.registry.ensure_ready(level)?;
            self.registry.resolve(level, fork_name, circuit_version)
        }
    }

    /// Verifying key of the active `level` prover.
    pub fn vk(&self, level: ProofLevel) -> Result<Vec<u8>> {
        Ok(self.active(level)?.vk().to_vec())
    }

    /* --------------------------------- chunk -------------------------------- */

    /// Prove a chunk with the active chunk artifacts.
    pub fn prove_chunk(&self, traces: &[BlockTrace]) -> Result<Proof> {
        self.prove_chunk_for(traces, None, None)
    }

    /// Prove a chunk for an explicit fork/version.
    pub fn prove_chunk_for(
        &self,
        traces: &[BlockTrace],
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Proof> {
        let set = self.select(ProofLevel::Chunk, fork_name, circuit_version)?;
        let t0 = Instant::now();
        let info = ChunkInfo::from_block_traces(traces)?;
        let payload = bincode::serialize(traces)
            .context("encoding chunk witness")
            .map_err(Error::Backend)?;
        let witness = Witness {
            level: ProofLevel::Chunk,
            public_input: info.hash(),
            payload,
        };
        let bytes = run_prove::<B>(&set, &witness)?;

        let first = info.block_numbers.first().copied().unwrap_or_default();
        let proof = Proof {
            level: ProofLevel::Chunk,
            context: set.context().clone(),
            transition: info.transition(),
            public_input: witness.public_input,
            proof: bytes,
            vk: set.vk().to_vec(),
            batch_hash: None,
            git_version: Some(crate::GIT_VERSION.to_owned()),
            meta: json!({
                "backend": B::NAME,
                "n_blocks": traces.len(),
                "elapsed_ms": t0.elapsed().as_millis(),
            }),
            chunk_info: Some(info),
        };
        info!(
            context = %set.context(),
            first_block = first,
            n_blocks = traces.len(),
            chunk_hash = %proof.public_input,
            "chunk proof generated"
        );
        Ok(self.finish(proof, &format!("chunk_{first}")))
    }

    /* --------------------------------- batch -------------------------------- */

    /// Re-verify chunk proofs with the active batch prover's chunk key.
    pub fn check_chunk_proofs(&self, chunk_proofs: &[Proof]) -> Result<()> {
        let set = self.active(ProofLevel::Batch)?;
        self.check_chunk_proofs_in(&set, chunk_proofs)
    }

    /// Re-verify chunk proofs against an explicit batch fork/version.
    pub fn check_chunk_proofs_for(
        &self,
        chunk_proofs: &[Proof],
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<()> {
        let set = self.select(ProofLevel::Batch, fork_name, circuit_version)?;
        self.check_chunk_proofs_in(&set, chunk_proofs)
    }

    fn check_chunk_proofs_in(&self, set: &ArtifactSet, chunk_proofs: &[Proof]) -> Result<()> {
        for (index, p) in chunk_proofs.iter().enumerate() {
            check_child_proof::<B>(set, ProofLevel::Chunk, p).map_err(|e| match e {
                ChildCheck::Invalid(reason) => {
                    warn!(index, %reason, "chunk proof failed pre-check");
                    MalformedInputError::InvalidChunkProof { index, reason }.into()
                }
                ChildCheck::Backend(e) => Error::Backend(e),
            })?;
        }
        debug!(n = chunk_proofs.len(), "chunk proofs pre-checked");
        Ok(())
    }

    /// Aggregate chunk proofs into a batch proof with the active batch artifacts.
    ///
    /// `chunk_infos[i]`, `chunk_proofs[i]` and `header.chunk_hashes[i]` must all
    /// describe the same chunk, in batch order.
    pub fn prove_batch(
        &self,
        chunk_infos: &[ChunkInfo],
        chunk_proofs: &[Proof],
        header: &BatchHeader,
    ) -> Result<Proof> {
        self.prove_batch_for(chunk_infos, chunk_proofs, header, None, None)
    }

    /// [`Prover::prove_batch`] for an explicit fork/version.
    pub fn prove_batch_for(
        &self,
        chunk_infos: &[ChunkInfo],
        chunk_proofs: &[Proof],
        header: &BatchHeader,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Proof> {
        let set = self.select(ProofLevel::Batch, fork_name, circuit_version)?;
        let t0 = Instant::now();

        let hashes = check_batch_layout(chunk_infos, chunk_proofs, header)?;
        self.check_chunk_proofs_in(&set, chunk_proofs)?;

        let (first, last) = match (chunk_infos.first(), chunk_infos.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(MalformedInputError::Empty { what: "chunk" }.into()),
        };
        let transition = StateTransition::span(&first.transition(), &last.transition());
        let batch_hash = header.batch_hash();
        let public_input = batch_public_input(&transition, &batch_hash);

        let inner: Vec<(H256, &[u8])> = chunk_proofs
            .iter()
            .zip(&hashes)
            .map(|(p, h)| (*h, p.bytes()))
            .collect();
        let payload = bincode::serialize(&(batch_hash, inner))
            .context("encoding batch witness")
            .map_err(Error::Backend)?;
        let witness = Witness {
            level: ProofLevel::Batch,
            public_input,
            payload,
        };
        let bytes = run_prove::<B>(&set, &witness)?;

        let proof = Proof {
            level: ProofLevel::Batch,
            context: set.context().clone(),
            transition,
            public_input,
            proof: bytes,
            vk: set.vk().to_vec(),
            chunk_info: None,
            batch_hash: Some(batch_hash),
            git_version: Some(crate::GIT_VERSION.to_owned()),
            meta: json!({
                "backend": B::NAME,
                "batch_index": header.batch_index,
                "n_chunks": chunk_proofs.len(),
                "elapsed_ms": t0.elapsed().as_millis(),
            }),
        };
        info!(
            context = %set.context(),
            batch_index = header.batch_index,
            n_chunks = chunk_proofs.len(),
            %batch_hash,
            "batch proof generated"
        );
        Ok(self.finish(proof, &format!("batch_{}", header.batch_index)))
    }

    /* -------------------------------- bundle -------------------------------- */

    /// Aggregate batch proofs, in order, into a bundle proof with the active bundle artifacts.
    pub fn prove_bundle(&self, batch_proofs: &[Proof]) -> Result<Proof> {
        self.prove_bundle_for(batch_proofs, None, None)
    }

    /// [`Prover::prove_bundle`] for an explicit fork/version.
    pub fn prove_bundle_for(
        &self,
        batch_proofs: &[Proof],
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Proof> {
        let set = self.select(ProofLevel::Bundle, fork_name, circuit_version)?;
        let t0 = Instant::now();

        let (first, last) = match (batch_proofs.first(), batch_proofs.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(MalformedInputError::Empty { what: "batch" }.into()),
        };

        let mut batch_hashes = Vec::with_capacity(batch_proofs.len());
        for (index, p) in batch_proofs.iter().enumerate() {
            let invalid = |reason: String| -> Error {
                MalformedInputError::InvalidBatchProof { index, reason }.into()
            };
            if self.options.recheck_batch_proofs {
                check_child_proof::<B>(&set, ProofLevel::Batch, p).map_err(|e| match e {
                    ChildCheck::Invalid(reason) => {
                        warn!(index, %reason, "batch proof failed re-check");
                        invalid(reason)
                    }
                    ChildCheck::Backend(e) => Error::Backend(e),
                })?;
            } else if p.level != ProofLevel::Batch {
                return Err(invalid(format!("expected a batch proof, got {}", p.level)));
            }
            let bh = p
                .batch_hash
                .ok_or_else(|| invalid("batch proof carries no batch hash".into()))?;
            batch_hashes.push(bh);
        }

        for (i, pair) in batch_proofs.windows(2).enumerate() {
            if !pair[0].transition.chains_into(&pair[1].transition) {
                return Err(MalformedInputError::NonContiguous {
                    level: ProofLevel::Batch,
                    index: i + 1,
                }
                .into());
            }
        }

        let transition = StateTransition::span(&first.transition, &last.transition);
        let commitment = bundle_batches_commitment(&batch_hashes);
        let public_input = bundle_public_input(&transition, &commitment);

        let inner: Vec<(H256, &[u8])> = batch_proofs
            .iter()
            .zip(&batch_hashes)
            .map(|(p, h)| (*h, p.bytes()))
            .collect();
        let payload = bincode::serialize(&inner)
            .context("encoding bundle witness")
            .map_err(Error::Backend)?;
        let witness = Witness {
            level: ProofLevel::Bundle,
            public_input,
            payload,
        };
        let bytes = run_prove::<B>(&set, &witness)?;

        let proof = Proof {
            level: ProofLevel::Bundle,
            context: set.context().clone(),
            transition,
            public_input,
            proof: bytes,
            vk: set.vk().to_vec(),
            chunk_info: None,
            batch_hash: Some(commitment),
            git_version: Some(crate::GIT_VERSION.to_owned()),
            meta: json!({
                "backend": B::NAME,
                "n_batches": batch_proofs.len(),
                "rechecked": self.options.recheck_batch_proofs,
                "elapsed_ms": t0.elapsed().as_millis(),
            }),
        };
        info!(
            context = %set.context(),
            n_batches = batch_proofs.len(),
            "bundle proof generated"
        );
        let name = format!("bundle_{}", &hex::encode(commitment.as_bytes())[..16]);
        Ok(self.finish(proof, &name))
    }

    /* -------------------------------- helpers ------------------------------- */

    fn finish(&self, proof: Proof, name: &str) -> Proof {
        if let Some(dir) = &self.options.output_dir {
            match dump_proof(dir, name, &proof) {
                Ok(()) => debug!(dir = %dir.display(), name, "proof dumped"),
                Err(e) => warn!(dir = %dir.display(), name, error = %e, "failed to dump proof"),
            }
        }
        proof
    }
}

/// Layout checks of a batch request. Returns the chunk hashes in batch order.
fn check_batch_layout(
    chunk_infos: &[ChunkInfo],
    chunk_proofs: &[Proof],
    header: &BatchHeader,
) -> Result<Vec<H256>> {
    if chunk_proofs.len() != chunk_infos.len() {
        return Err(MalformedInputError::SizeMismatch {
            what: "chunk proofs",
            expected: chunk_infos.len(),
            actual: chunk_proofs.len(),
        }
        .into());
    }
    if header.chunk_hashes.len() != chunk_infos.len() {
        return Err(MalformedInputError::SizeMismatch {
            what: "batch header chunk hashes",
            expected: chunk_infos.len(),
            actual: header.chunk_hashes.len(),
        }
        .into());
    }
    if chunk_infos.is_empty() {
        return Err(MalformedInputError::Empty { what: "chunk" }.into());
    }
    if chunk_infos.len() > MAX_AGG_CHUNKS {
        return Err(MalformedInputError::TooManyChunks {
            count: chunk_infos.len(),
            max: MAX_AGG_CHUNKS,
        }
        .into());
    }

    let hashes: Vec<H256> = chunk_infos.iter().map(ChunkInfo::hash).collect();
    for (index, (h, expected)) in hashes.iter().zip(&header.chunk_hashes).enumerate() {
        if h != expected {
            return Err(misplaced(index, *expected, *h, &header.chunk_hashes));
        }
    }

    for (index, (p, h)) in chunk_proofs.iter().zip(&hashes).enumerate() {
        let actual = p.chunk_info.as_ref().map_or(H256::ZERO, ChunkInfo::hash);
        if actual != *h {
            return Err(misplaced(index, *h, actual, &hashes));
        }
    }

    for (i, pair) in chunk_infos.windows(2).enumerate() {
        if !pair[0].transition().chains_into(&pair[1].transition()) {
            return Err(MalformedInputError::NonContiguous {
                level: ProofLevel::Chunk,
                index: i + 1,
            }
            .into());
        }
    }
    Ok(hashes)
}

/// `actual` sits at `index` where `expected` belongs: out of order if it
/// belongs elsewhere in `order`, a plain mismatch otherwise.
fn misplaced(index: usize, expected: H256, actual: H256, order: &[H256]) -> Error {
    if order.contains(&actual) {
        MalformedInputError::OutOfOrder {
            index,
            expected,
            actual,
        }
        .into()
    } else {
        MalformedInputError::ChunkHashMismatch {
            index,
            expected,
            actual,
        }
        .into()
    }
}

enum ChildCheck {
    Invalid(String),
    Backend(anyhow::Error),
}

/// Independent check of a `level` input proof under an aggregator's artifact set.
fn check_child_proof<B: ProofBackend>(
    set: &ArtifactSet,
    level: ProofLevel,
    p: &Proof,
) -> std::result::Result<(), ChildCheck> {
    p.sanity_check()
        .map_err(|e| ChildCheck::Invalid(e.to_string()))?;
    let child_vk = set
        .vk_for(level)
        .ok_or_else(|| ChildCheck::Backend(anyhow!("no {level} key loaded in {}", set.key())))?;
    envelope_checks(level, p, child_context(set), child_vk).map_err(ChildCheck::Invalid)?;
    match B::verify(set, level, &p.public_input, p.bytes()) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ChildCheck::Invalid("proof does not verify".into())),
        Err(e) => Err(ChildCheck::Backend(e)),
    }
}

/// Run the backend, turning engine errors and panics into [`Error::Backend`].
fn run_prove<B: ProofBackend>(set: &ArtifactSet, witness: &Witness) -> Result<Vec<u8>> {
    match catch_unwind(AssertUnwindSafe(|| B::prove(set, witness))) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(Error::Backend(e.context(format!("proving {}", set.key())))),
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());
            Err(Error::Backend(anyhow!("backend panicked proving {}: {msg}", set.key())))
        }
    }
}
