// crates/zkagg-trace/src/format.rs

//! Versioned envelope around an ordered list of block traces.

use serde::{Deserialize, Serialize};
use zkagg_core::BlockTrace;

/// Current envelope version.
pub const TRACE_FILE_VERSION: u16 = 1;

/// Trace envelope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceFile {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// Blocks in execution order.
    pub blocks: Vec<BlockTrace>,
    /// Optional metadata (source node, generator seed…).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl TraceFile {
    /// Wrap `blocks` in a current-version envelope.
    #[must_use]
    pub const fn new(blocks: Vec<BlockTrace>) -> Self {
        Self {
            version: TRACE_FILE_VERSION,
            blocks,
            meta: None,
        }
    }

    /// Number of blocks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the envelope holds no block.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Chain id of the first block, if any.
    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.blocks.first().map(|b| b.chain_id)
    }
}
