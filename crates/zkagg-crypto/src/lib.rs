// crates/zkagg-crypto/src/lib.rs

//! Crypto substrate: BLAKE3 commitments and a transcript with a simple
//! absorb/challenge API.
//!
//! Every digest in the workspace (chunk hashes, batch hashes, public-input
//! hashes, the reference backend's MACs) goes through a [`Label`] so that two
//! commitments over identical bytes but different meaning never collide.
//!
//! ⚠️ **Security note:** the transcript models a domain-separated random oracle
//! using BLAKE3. It binds public inputs for the reference backend; it is not a
//! replacement for a real proof system.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use blake3::Hasher;

/// Fixed domain prefix to seed transcripts.
const TRANSCRIPT_PREFIX: &[u8] = b"zkagg.transcript.v1";

/// Fixed domain prefix for one-shot labeled commitments.
const COMMIT_PREFIX: &[u8] = b"zkagg.commit.v1";

/// Canonical labels used across the workspace.
/// Avoids stringly-typed mistakes in domain separation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Label {
    /// Data hash over a chunk's block contexts and transaction hashes.
    ChunkDataHash,
    /// Public-input hash of a chunk (the "chunk hash").
    ChunkPi,
    /// Batch header commitment (the "batch hash").
    BatchHash,
    /// Public-input hash of a batch proof.
    BatchPi,
    /// Ordered commitment over the batch hashes inside a bundle.
    BundleBatches,
    /// Public-input hash of a bundle proof.
    BundlePi,
    /// Key derivation from a verifying key.
    VkKey,
    /// Commitment over an opaque witness payload.
    Witness,
    /// Final proof MAC.
    ProofMac,
}

impl Label {
    /// Borrow the canonical string.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChunkDataHash => "zkagg/chunk_data_hash",
            Self::ChunkPi => "zkagg/chunk_pi",
            Self::BatchHash => "zkagg/batch_hash",
            Self::BatchPi => "zkagg/batch_pi",
            Self::BundleBatches => "zkagg/bundle_batches",
            Self::BundlePi => "zkagg/bundle_pi",
            Self::VkKey => "zkagg/vk_key",
            Self::Witness => "zkagg/witness",
            Self::ProofMac => "zkagg/proof_mac",
        }
    }
}

/// Incremental, domain-separated hasher for a single labeled commitment.
///
/// Each `update` is length-prefixed so adjacent fields cannot be re-split.
#[derive(Clone, Debug)]
pub struct LabeledHasher {
    st: Hasher,
}

impl LabeledHasher {
    /// Start a commitment under `label`.
    #[must_use]
    pub fn new(label: Label) -> Self {
        let mut st = Hasher::new();
        st.update(COMMIT_PREFIX);
        let l = label.as_str();
        st.update(&(l.len() as u32).to_le_bytes());
        st.update(l.as_bytes());
        Self { st }
    }

    /// Start a keyed commitment (MAC) under `label`.
    #[must_use]
    pub fn new_keyed(key: &[u8; 32], label: Label) -> Self {
        let mut st = Hasher::new_keyed(key);
        st.update(COMMIT_PREFIX);
        let l = label.as_str();
        st.update(&(l.len() as u32).to_le_bytes());
        st.update(l.as_bytes());
        Self { st }
    }

    /// Absorb a length-prefixed byte string.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.st.update(&(bytes.len() as u64).to_le_bytes());
        self.st.update(bytes);
        self
    }

    /// Absorb a big-endian `u64`.
    pub fn update_u64(&mut self, x: u64) -> &mut Self {
        self.update(&x.to_be_bytes())
    }

    /// Finish and return the 32-byte digest.
    #[must_use]
    pub fn finalize(&self) -> [u8; 32] {
        *self.st.finalize().as_bytes()
    }
}

/// One-shot labeled commitment over a list of parts.
#[must_use]
pub fn commit(label: Label, parts: &[&[u8]]) -> [u8; 32] {
    let mut h = LabeledHasher::new(label);
    for p in parts {
        h.update(p);
    }
    h.finalize()
}

/// Derive a 32-byte key from arbitrary key material (e.g. a verifying key).
#[must_use]
pub fn derive_key(label: Label, material: &[u8]) -> [u8; 32] {
    blake3::derive_key(label.as_str(), material)
}

/// Constant-time equality of two 32-byte digests.
#[must_use]
pub fn digest_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    blake3::Hash::from(*a) == blake3::Hash::from(*b)
}

/// Transcript interface used by backends.
///
/// Implementations should apply domain separation for both absorbs and challenges.
pub trait Transcript {
    /// Add raw bytes under a label (domain-separated).
    fn absorb(&mut self, label: Label, bytes: &[u8]);

    /// Convenience: absorb an unsigned 64-bit value (LE).
    fn absorb_u64(&mut self, label: Label, x: u64) {
        self.absorb(label, &x.to_le_bytes());
    }

    /// Squeeze `n` bytes as a challenge under `label`.
    #[must_use]
    fn challenge_bytes(&mut self, label: Label, n: usize) -> Vec<u8>;
}

/// BLAKE3-based transcript.
#[derive(Clone, Debug)]
pub struct Blake3Transcript {
    st: Hasher,
}

impl Blake3Transcript {
    /// Create a new transcript with a domain separation string.
    #[must_use]
    pub fn new(domain_sep: &str) -> Self {
        let mut st = Hasher::new();
        st.update(TRANSCRIPT_PREFIX);
        st.update(&(domain_sep.len() as u32).to_le_bytes());
        st.update(domain_sep.as_bytes());
        Self { st }
    }

    /// Create a transcript whose every output is keyed by `key`.
    #[must_use]
    pub fn new_keyed(key: &[u8; 32], domain_sep: &str) -> Self {
        let mut st = Hasher::new_keyed(key);
        st.update(TRANSCRIPT_PREFIX);
        st.update(&(domain_sep.len() as u32).to_le_bytes());
        st.update(domain_sep.as_bytes());
        Self { st }
    }
}

impl Transcript for Blake3Transcript {
    fn absorb(&mut self, label: Label, bytes: &[u8]) {
        let l = label.as_str();
        self.st.update(b"absorb");
        self.st.update(&(l.len() as u32).to_le_bytes());
        self.st.update(l.as_bytes());
        self.st.update(&(bytes.len() as u64).to_le_bytes());
        self.st.update(bytes);
    }

    fn challenge_bytes(&mut self, label: Label, n: usize) -> Vec<u8> {
        let l = label.as_str();
        let mut st = self.st.clone();
        st.update(b"challenge");
        st.update(&(l.len() as u32).to_le_bytes());
        st.update(l.as_bytes());

        let mut out = vec![0u8; n];
        st.finalize_xof().fill(&mut out);

        // Forward progress after a challenge.
        self.st.update(b"after_challenge");
        self.st.update(&(l.len() as u32).to_le_bytes());
        self.st.update(l.as_bytes());

        out
    }
}
