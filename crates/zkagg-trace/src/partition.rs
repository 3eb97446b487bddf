//! Split an ordered block list into chunks and build the batch header that
//! commits to them.
//!
//! Chunk boundaries never reorder blocks: chunk `i` holds blocks
//! `[i*n, (i+1)*n)` and the last chunk may be shorter.

use anyhow::{ensure, Result};
use zkagg_core::{BatchHeader, BlockTrace, ChunkInfo, H256};

/// Split `blocks` into chunks of at most `blocks_per_chunk` blocks.
pub fn split_into_chunks(
    blocks: &[BlockTrace],
    blocks_per_chunk: usize,
) -> Result<Vec<Vec<BlockTrace>>> {
    ensure!(blocks_per_chunk > 0, "blocks_per_chunk must be > 0");
    Ok(blocks
        .chunks(blocks_per_chunk)
        .map(<[BlockTrace]>::to_vec)
        .collect())
}

/// Derive the chunk info of every chunk, in order.
pub fn chunk_infos(chunks: &[Vec<BlockTrace>]) -> zkagg_core::Result<Vec<ChunkInfo>> {
    chunks.iter().map(|c| ChunkInfo::from_block_traces(c)).collect()
}

/// Batch header over `infos` in the given order.
#[must_use]
pub fn batch_header(
    batch_index: u64,
    parent_batch_hash: H256,
    infos: &[ChunkInfo],
    blocks: &[BlockTrace],
) -> BatchHeader {
    let l1_popped = blocks
        .iter()
        .flat_map(|b| &b.transactions)
        .filter(|t| t.is_l1_msg)
        .count() as u64;
    BatchHeader {
        version: 3,
        batch_index,
        parent_batch_hash,
        l1_message_popped: l1_popped,
        total_l1_message_popped: l1_popped,
        last_block_timestamp: blocks.last().map_or(0, |b| b.header.timestamp),
        chunk_hashes: infos.iter().map(ChunkInfo::hash).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_traces, GeneratorConfig};

    #[test]
    fn split_keeps_order_and_sizes() {
        let blocks = generate_traces(GeneratorConfig::default(), 7);
        let chunks = split_into_chunks(&blocks, 3).unwrap();
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(chunks[2][0].number(), 7);
        assert!(split_into_chunks(&blocks, 0).is_err());
    }

    #[test]
    fn header_lists_chunks_in_order() {
        let blocks = generate_traces(GeneratorConfig::default(), 4);
        let chunks = split_into_chunks(&blocks, 2).unwrap();
        let infos = chunk_infos(&chunks).unwrap();
        let hdr = batch_header(9, H256::ZERO, &infos, &blocks);
        assert_eq!(hdr.chunk_hashes, vec![infos[0].hash(), infos[1].hash()]);
        assert_eq!(hdr.last_block_timestamp, blocks[3].header.timestamp);
        assert!(infos[0].transition().chains_into(&infos[1].transition()));
    }
}
