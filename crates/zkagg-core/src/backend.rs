//! Backend abstraction for proving and verification.
//!
//! Implementors provide a *stateless* API (associated functions) over a loaded
//! [`ArtifactSet`]: `prove` turns a witness into opaque proof bytes bound to the
//! witness's public input, `verify` checks such bytes. The orchestration layer
//! never looks inside the bytes, so any proof system can sit behind this trait.
//!
//! ## Contracts implementors should uphold
//! - `prove` must bind the proof to `witness.public_input` and to the verifying
//!   key of the artifact set it was given.
//! - `verify` returns `Ok(false)` for a proof that is well-formed but does not
//!   check; `Err` is reserved for engine failures (missing key material,
//!   resource exhaustion, ...).
//! - Neither function should panic for malformed inputs.
//!
//! [`DigestBackend`] is the reference implementation: a keyed-transcript MAC
//! standing in for circuit proofs, used by the CLI, the FFI gateway and tests.

use anyhow::{anyhow, ensure, Context, Result};
use zkagg_crypto::{commit, derive_key, digest_eq, Blake3Transcript, Label, Transcript};

use crate::registry::{required_degrees, ArtifactSet};
use crate::types::{ProofLevel, H256};

/// Input handed to [`ProofBackend::prove`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    /// Level being proven; must match the artifact set's level.
    pub level: ProofLevel,
    /// Public input the proof is bound to.
    pub public_input: H256,
    /// Level-specific private data (traces, child proofs), backend-encoded.
    pub payload: Vec<u8>,
}

/// Minimal backend API the orchestration layer depends on.
///
/// Backends are used as type parameters, e.g. `Prover::<DigestBackend>::new(..)`.
pub trait ProofBackend {
    /// Stable backend name recorded in proof metadata.
    const NAME: &'static str;

    /// Produce proof bytes for `witness` using `artifacts`.
    ///
    /// # Errors
    /// Returns an error if the artifact set lacks what the level needs or the
    /// engine fails.
    fn prove(artifacts: &ArtifactSet, witness: &Witness) -> Result<Vec<u8>>;

    /// Check `proof` for a `level` proof bound to `public_input`.
    ///
    /// `level` is either the artifact set's own level or its child level
    /// (aggregators re-check their inputs with the child key).
    ///
    /// # Errors
    /// Returns an error only if verification could not be carried out.
    fn verify(
        artifacts: &ArtifactSet,
        level: ProofLevel,
        public_input: &H256,
        proof: &[u8],
    ) -> Result<bool>;
}

/// Reference backend: `proof = commitment(witness) || mac_vk(level, pi, commitment)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBackend;

/// Transcript domain of the reference backend.
pub const DS_DIGEST_BACKEND: &str = "zkagg/digest-backend/v1";

/// Proof length emitted by [`DigestBackend`].
pub const DIGEST_PROOF_LEN: usize = 64;

impl DigestBackend {
    fn tag(vk: &[u8], level: ProofLevel, public_input: &H256, commitment: &[u8; 32]) -> [u8; 32] {
        let key = derive_key(Label::VkKey, vk);
        let mut tr = Blake3Transcript::new_keyed(&key, DS_DIGEST_BACKEND);
        tr.absorb(Label::ProofMac, level.as_str().as_bytes());
        tr.absorb(Label::ProofMac, public_input.as_bytes());
        tr.absorb(Label::Witness, commitment);
        let mut out = [0u8; 32];
        out.copy_from_slice(&tr.challenge_bytes(Label::ProofMac, 32));
        out
    }
}

impl ProofBackend for DigestBackend {
    const NAME: &'static str = "digest";

    fn prove(artifacts: &ArtifactSet, witness: &Witness) -> Result<Vec<u8>> {
        ensure!(
            witness.level == artifacts.level(),
            "witness is for {} but artifact set {} was supplied",
            witness.level,
            artifacts.key()
        );
        for &d in required_degrees(witness.level) {
            artifacts
                .params(d)
                .with_context(|| format!("params degree {d} not loaded for {}", artifacts.key()))?;
        }

        let commitment = commit(Label::Witness, &[&witness.payload]);
        let tag = Self::tag(artifacts.vk(), witness.level, &witness.public_input, &commitment);

        let mut out = Vec::with_capacity(DIGEST_PROOF_LEN);
        out.extend_from_slice(&commitment);
        out.extend_from_slice(&tag);
        Ok(out)
    }

    fn verify(
        artifacts: &ArtifactSet,
        level: ProofLevel,
        public_input: &H256,
        proof: &[u8],
    ) -> Result<bool> {
        let vk = artifacts
            .vk_for(level)
            .ok_or_else(|| anyhow!("no {level} verifying key in artifact set {}", artifacts.key()))?;
        if proof.len() != DIGEST_PROOF_LEN {
            return Ok(false);
        }
        let (commitment, tag) = proof.split_at(32);
        let commitment: [u8; 32] = commitment.try_into()?;
        let tag: [u8; 32] = tag.try_into()?;
        Ok(digest_eq(&tag, &Self::tag(vk, level, public_input, &commitment)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::registry::ArtifactKey;
    use crate::types::VersionContext;

    fn chunk_set(vk: u8) -> ArtifactSet {
        ArtifactSet::from_parts(
            ArtifactKey::new(ProofLevel::Chunk, VersionContext::fork("bernoulli")),
            BTreeMap::from([(20, vec![1]), (24, vec![2])]),
            vec![vk; 32],
            None,
        )
    }

    fn witness() -> Witness {
        Witness {
            level: ProofLevel::Chunk,
            public_input: H256([5; 32]),
            payload: b"traces".to_vec(),
        }
    }

    #[test]
    fn prove_then_verify() {
        let set = chunk_set(1);
        let w = witness();
        let proof = DigestBackend::prove(&set, &w).unwrap();
        assert_eq!(proof.len(), DIGEST_PROOF_LEN);
        assert!(DigestBackend::verify(&set, ProofLevel::Chunk, &w.public_input, &proof).unwrap());
    }

    #[test]
    fn proof_is_bound_to_public_input_and_vk() {
        let w = witness();
        let proof = DigestBackend::prove(&chunk_set(1), &w).unwrap();
        assert!(!DigestBackend::verify(&chunk_set(1), ProofLevel::Chunk, &H256([6; 32]), &proof).unwrap());
        assert!(!DigestBackend::verify(&chunk_set(2), ProofLevel::Chunk, &w.public_input, &proof).unwrap());

        let mut flipped = proof;
        flipped[40] ^= 1;
        assert!(!DigestBackend::verify(&chunk_set(1), ProofLevel::Chunk, &w.public_input, &flipped).unwrap());
    }

    #[test]
    fn missing_params_degree_is_an_error() {
        let set = ArtifactSet::from_parts(
            ArtifactKey::new(ProofLevel::Chunk, VersionContext::default()),
            BTreeMap::from([(20, vec![1])]),
            vec![1; 32],
            None,
        );
        let err = DigestBackend::prove(&set, &witness()).unwrap_err();
        assert!(err.to_string().contains("degree 24"));
    }

    #[test]
    fn verify_without_key_is_an_error() {
        let set = chunk_set(1);
        assert!(DigestBackend::verify(&set, ProofLevel::Batch, &H256::ZERO, &[0; 64]).is_err());
    }
}
