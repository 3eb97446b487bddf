//! ChunkInfo extraction: the canonical commitment of a chunk's block traces.
//!
//! [`ChunkInfo`] is a pure function of the ordered trace list. It is the
//! public-input binding of a chunk proof and the forward commitment a batch
//! proof is checked against, so callers can compute it without proving
//! anything (e.g. to pre-check a batch header before submission).
//!
//! Commitments:
//! ```text
//! data_hash  = H_data( for each block: number || timestamp || gas_limit || n_txs,
//!                      then every tx_hash in order )
//! chunk_hash = H_pi( chain_id || prev_state_root || post_state_root
//!                    || withdraw_root || data_hash
//!                    || n_blocks || block_numbers || is_padding || tx_bytes )
//! ```
//!
//! Every field of [`ChunkInfo`] feeds the chunk hash, so a chunk proof whose
//! embedded info was edited no longer matches its public input.

use serde::{Deserialize, Serialize};
use zkagg_crypto::{Label, LabeledHasher};

use crate::error::{MalformedInputError, Result};
use crate::types::{hex_bytes, BlockTrace, StateTransition, H256};

/// Canonical descriptor of a chunk, derived from its block traces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Chain id shared by every block.
    pub chain_id: u64,
    /// State root before the first block.
    pub prev_state_root: H256,
    /// State root after the last block.
    pub post_state_root: H256,
    /// Withdraw root after the last block.
    pub withdraw_root: H256,
    /// Commitment over block contexts and transaction hashes.
    pub data_hash: H256,
    /// Block numbers in chunk order.
    pub block_numbers: Vec<u64>,
    /// Padding chunk (repeats the previous chunk to fill a batch slot).
    #[serde(default)]
    pub is_padding: bool,
    /// Concatenated L2 transaction payloads (L1 messages excluded).
    #[serde(with = "hex_bytes", default)]
    pub tx_bytes: Vec<u8>,
}

impl ChunkInfo {
    /// Derive the chunk info from an ordered list of block traces.
    ///
    /// Fails if the list is empty, spans more than one chain, or is not
    /// contiguous (numbers, parent hashes and state roots must all chain).
    pub fn from_block_traces(traces: &[BlockTrace]) -> Result<Self> {
        check_contiguous(traces)?;
        let (first, last) = match (traces.first(), traces.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(MalformedInputError::EmptyTraces.into()),
        };

        let mut h = LabeledHasher::new(Label::ChunkDataHash);
        for t in traces {
            h.update_u64(t.header.number)
                .update_u64(t.header.timestamp)
                .update_u64(t.header.gas_limit)
                .update_u64(t.transactions.len() as u64);
        }
        for tx in traces.iter().flat_map(|t| &t.transactions) {
            h.update(tx.tx_hash.as_bytes());
        }

        let tx_bytes = traces
            .iter()
            .flat_map(|t| &t.transactions)
            .filter(|tx| !tx.is_l1_msg)
            .flat_map(|tx| tx.data.iter().copied())
            .collect();

        Ok(Self {
            chain_id: first.chain_id,
            prev_state_root: first.prev_state_root,
            post_state_root: last.header.state_root,
            withdraw_root: last.withdraw_trie_root,
            data_hash: H256(h.finalize()),
            block_numbers: traces.iter().map(BlockTrace::number).collect(),
            is_padding: false,
            tx_bytes,
        })
    }

    /// The chunk hash: public-input commitment of this chunk.
    #[must_use]
    pub fn hash(&self) -> H256 {
        let mut h = LabeledHasher::new(Label::ChunkPi);
        h.update_u64(self.chain_id)
            .update(self.prev_state_root.as_bytes())
            .update(self.post_state_root.as_bytes())
            .update(self.withdraw_root.as_bytes())
            .update(self.data_hash.as_bytes())
            .update_u64(self.block_numbers.len() as u64);
        for n in &self.block_numbers {
            h.update_u64(*n);
        }
        h.update(&[u8::from(self.is_padding)]).update(&self.tx_bytes);
        H256(h.finalize())
    }

    /// State-root transition covered by this chunk.
    #[must_use]
    pub const fn transition(&self) -> StateTransition {
        StateTransition {
            chain_id: self.chain_id,
            prev_state_root: self.prev_state_root,
            post_state_root: self.post_state_root,
            withdraw_root: self.withdraw_root,
        }
    }
}

/// Derive the [`ChunkInfo`] for `traces`.
pub fn derive(traces: &[BlockTrace]) -> Result<ChunkInfo> {
    ChunkInfo::from_block_traces(traces)
}

/// Compute only the chunk hash for `traces`.
pub fn chunk_hash(traces: &[BlockTrace]) -> Result<H256> {
    derive(traces).map(|info| info.hash())
}

/// Structural checks shared by extraction and chunk proving.
pub fn check_contiguous(traces: &[BlockTrace]) -> std::result::Result<(), MalformedInputError> {
    let first = traces.first().ok_or(MalformedInputError::EmptyTraces)?;
    for (i, pair) in traces.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let index = i + 1;
        if next.chain_id != first.chain_id {
            return Err(MalformedInputError::ChainIdMismatch {
                index,
                expected: first.chain_id,
                actual: next.chain_id,
            });
        }
        if prev.number().checked_add(1) != Some(next.number()) {
            return Err(MalformedInputError::NonContiguousBlocks {
                index,
                prev: prev.number(),
                next: next.number(),
            });
        }
        if next.header.parent_hash != prev.header.hash {
            return Err(MalformedInputError::BrokenParentLink {
                index,
                expected: prev.header.hash,
                actual: next.header.parent_hash,
            });
        }
        if next.prev_state_root != prev.header.state_root {
            return Err(MalformedInputError::StateRootMismatch {
                index,
                expected: prev.header.state_root,
                actual: next.prev_state_root,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{BlockHeader, TransactionTrace};

    fn h(n: u64, tag: u8) -> H256 {
        let mut b = [tag; 32];
        b[..8].copy_from_slice(&n.to_be_bytes());
        H256(b)
    }

    fn mk_traces(start: u64, n: u64) -> Vec<BlockTrace> {
        (start..start + n)
            .map(|num| BlockTrace {
                chain_id: 534_352,
                header: BlockHeader {
                    number: num,
                    hash: h(num, 0xbb),
                    parent_hash: h(num.wrapping_sub(1), 0xbb),
                    state_root: h(num, 0x55),
                    timestamp: 1_700_000_000 + num,
                    gas_limit: 10_000_000,
                },
                prev_state_root: h(num.wrapping_sub(1), 0x55),
                withdraw_trie_root: h(num, 0x77),
                transactions: vec![
                    TransactionTrace {
                        tx_hash: h(num, 0x01),
                        is_l1_msg: true,
                        data: vec![0xee; 4],
                    },
                    TransactionTrace {
                        tx_hash: h(num, 0x02),
                        is_l1_msg: false,
                        data: vec![num as u8; 3],
                    },
                ],
            })
            .collect()
    }

    #[test]
    fn derive_is_deterministic() {
        let traces = mk_traces(10, 3);
        let a = derive(&traces).unwrap();
        let b = derive(&traces).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.block_numbers, vec![10, 11, 12]);
        assert_eq!(a.prev_state_root, h(9, 0x55));
        assert_eq!(a.post_state_root, h(12, 0x55));
        assert_eq!(a.withdraw_root, h(12, 0x77));
        // Only L2 payloads land in tx_bytes.
        assert_eq!(a.tx_bytes, vec![10, 10, 10, 11, 11, 11, 12, 12, 12]);
    }

    #[test]
    fn hash_commits_to_tx_hashes() {
        let traces = mk_traces(1, 2);
        let base = chunk_hash(&traces).unwrap();
        let mut tweaked = traces;
        tweaked[1].transactions[0].tx_hash = H256([0xff; 32]);
        assert_ne!(base, chunk_hash(&tweaked).unwrap());
    }

    #[test]
    fn hash_commits_to_every_field() {
        let info = derive(&mk_traces(3, 2)).unwrap();
        let base = info.hash();

        let mut t = info.clone();
        t.block_numbers.reverse();
        assert_ne!(t.hash(), base);

        let mut t = info.clone();
        t.is_padding = true;
        assert_ne!(t.hash(), base);

        let mut t = info;
        t.tx_bytes.push(0);
        assert_ne!(t.hash(), base);
    }

    #[test]
    fn empty_is_rejected() {
        let err = derive(&[]).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(MalformedInputError::EmptyTraces)
        ));
    }

    #[test]
    fn gap_in_numbers_is_rejected() {
        let mut traces = mk_traces(1, 3);
        traces.remove(1);
        let err = derive(&traces).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(MalformedInputError::NonContiguousBlocks { index: 1, prev: 1, next: 3 })
        ));
    }

    #[test]
    fn state_root_break_is_rejected() {
        let mut traces = mk_traces(1, 3);
        traces[2].prev_state_root = H256([0x42; 32]);
        let err = derive(&traces).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(MalformedInputError::StateRootMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn parent_link_break_is_rejected() {
        let mut traces = mk_traces(1, 2);
        traces[1].header.parent_hash = H256::ZERO;
        let err = derive(&traces).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(MalformedInputError::BrokenParentLink { index: 1, .. })
        ));
    }

    #[test]
    fn mixed_chains_are_rejected() {
        let mut traces = mk_traces(1, 2);
        traces[1].chain_id = 1;
        let err = derive(&traces).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedInput(MalformedInputError::ChainIdMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn serde_roundtrip_keeps_hash() {
        let info = derive(&mk_traces(5, 2)).unwrap();
        let js = serde_json::to_string(&info).unwrap();
        let back: ChunkInfo = serde_json::from_str(&js).unwrap();
        assert_eq!(back.hash(), info.hash());
    }
}
