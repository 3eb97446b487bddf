//! Public-input bindings for aggregating levels.
//!
//! ```text
//! batch  pi = H_batch_pi ( chain_id || prev || post || withdraw || batch_hash )
//! bundle pi = H_bundle_pi( chain_id || prev || post || withdraw || H_batches(batch_hash_0 .. batch_hash_n) )
//! ```
//! Chunk proofs bind [`ChunkInfo::hash`](crate::ChunkInfo::hash).

use zkagg_crypto::{Label, LabeledHasher};

use crate::artifact::Proof;
use crate::types::{ProofLevel, StateTransition, H256};

fn transition_pi(label: Label, t: &StateTransition, tail: &H256) -> H256 {
    let mut h = LabeledHasher::new(label);
    h.update_u64(t.chain_id)
        .update(t.prev_state_root.as_bytes())
        .update(t.post_state_root.as_bytes())
        .update(t.withdraw_root.as_bytes())
        .update(tail.as_bytes());
    H256(h.finalize())
}

/// Public input of a batch proof.
#[must_use]
pub fn batch_public_input(transition: &StateTransition, batch_hash: &H256) -> H256 {
    transition_pi(Label::BatchPi, transition, batch_hash)
}

/// Ordered commitment over the batch hashes a bundle aggregates.
#[must_use]
pub fn bundle_batches_commitment(batch_hashes: &[H256]) -> H256 {
    let mut h = LabeledHasher::new(Label::BundleBatches);
    h.update_u64(batch_hashes.len() as u64);
    for b in batch_hashes {
        h.update(b.as_bytes());
    }
    H256(h.finalize())
}

/// Public input of a bundle proof.
#[must_use]
pub fn bundle_public_input(transition: &StateTransition, batches_commitment: &H256) -> H256 {
    transition_pi(Label::BundlePi, transition, batches_commitment)
}

/// Public input `proof` must be bound to, recomputed from its own fields.
///
/// `None` when the fields needed for the recomputation are missing.
#[must_use]
pub fn expected_public_input(proof: &Proof) -> Option<H256> {
    match proof.level {
        ProofLevel::Chunk => proof.chunk_info.as_ref().map(crate::ChunkInfo::hash),
        ProofLevel::Batch => proof
            .batch_hash
            .as_ref()
            .map(|bh| batch_public_input(&proof.transition, bh)),
        ProofLevel::Bundle => proof
            .batch_hash
            .as_ref()
            .map(|c| bundle_public_input(&proof.transition, c)),
    }
}
