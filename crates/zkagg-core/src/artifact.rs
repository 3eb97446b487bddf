//! Proof envelope shared by every level and every frontend (CLI/FFI).
//!
//! A [`Proof`] pins the level it was produced for, the fork/version context it
//! was produced under, the public state transition and public-input hash it
//! binds, the backend-opaque `proof` bytes, and the verifying key of the
//! producing circuit. Verification only ever succeeds under the **same**
//! context the proof carries.
//!
//! ## Backward/forward compatibility
//! - No `#[serde(deny_unknown_fields)]`, so newer producers with extra fields
//!   remain readable by older consumers.
//! - New fields are added as optional with `#[serde(default)]`.
//!
//! ## When to use `meta`
//! `meta` is for human/ops diagnostics (timings, input counts). It is never
//! consulted during verification.

use serde::{Deserialize, Serialize};

use crate::chunk_info::ChunkInfo;
use crate::error::{Error, MalformedInputError, Result};
use crate::types::{hex_bytes, ProofLevel, StateTransition, VersionContext, H256};

/// Proof bytes and instance encodings are laid out in 32-byte words.
pub const PROOF_WORD_SIZE: usize = 32;

/// Serialized proof produced at one level of the hierarchy.
///
/// **Invariants**
/// - `public_input` is the commitment the backend bound the proof to.
/// - `context` is the fork/version the producing artifact set was loaded
///   under; verifiers must reject a proof presented under another context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proof {
    /// Level the proof was produced for.
    pub level: ProofLevel,
    /// Fork/version context the proof was produced under.
    #[serde(default)]
    pub context: VersionContext,
    /// Public state transition covered by the proof.
    pub transition: StateTransition,
    /// Public-input hash the proof is bound to.
    pub public_input: H256,
    /// Opaque, backend-specific proof encoding.
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    /// Verifying key of the producing circuit.
    #[serde(with = "hex_bytes")]
    pub vk: Vec<u8>,
    /// Chunk info (chunk proofs only), for cross-checking by the batch level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_info: Option<ChunkInfo>,
    /// Batch proofs: the batch hash, for ordering inside a bundle.
    /// Bundle proofs: the commitment over the ordered batch hashes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_hash: Option<H256>,
    /// Version of the producing software.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_version: Option<String>,
    /// Free-form metadata for debugging/observability.
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl Proof {
    /// Returns the proof bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.proof
    }

    /// Length of the proof bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.proof.len()
    }

    /// Whether the proof byte vector is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proof.is_empty()
    }

    /// Format checks run before any cryptographic work.
    pub fn sanity_check(&self) -> std::result::Result<(), MalformedInputError> {
        if self.proof.is_empty() {
            return Err(MalformedInputError::BadProof("proof not ready".into()));
        }
        if self.proof.len() % PROOF_WORD_SIZE != 0 {
            return Err(MalformedInputError::BadProof(format!(
                "proof buffer length must be a multiple of {PROOF_WORD_SIZE}, got: {}",
                self.proof.len()
            )));
        }
        if self.vk.is_empty() {
            return Err(MalformedInputError::BadProof("vk not ready".into()));
        }
        match (self.level, &self.chunk_info, &self.batch_hash) {
            (ProofLevel::Chunk, None, _) => Err(MalformedInputError::BadProof(
                "chunk proof carries no chunk info".into(),
            )),
            (ProofLevel::Batch | ProofLevel::Bundle, _, None) => Err(
                MalformedInputError::BadProof(format!("{} proof carries no batch hash", self.level)),
            ),
            _ => Ok(()),
        }
    }

    /// Encode as JSON bytes (the boundary wire format).
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::decode("proof", e))
    }

    /// Decode from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode("proof", e))
    }
}
