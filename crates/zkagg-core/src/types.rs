//! Canonical core types used across the zkagg workspace.
//!
//! These live in `zkagg-core` and are re-exported at the crate root so other
//! crates can import via `zkagg_core::BlockTrace`, `zkagg_core::H256`, etc.
//!
//! Serialized forms are JSON-first and conservative: hashes are `0x`-prefixed
//! hex strings, opaque byte payloads are plain hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zkagg_crypto::{Label, LabeledHasher};

/// 32-byte hash (state roots, block hashes, commitments).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct H256(pub [u8; 32]);

impl H256 {
    /// The all-zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether every byte is zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for H256 {
    #[inline]
    fn from(b: [u8; 32]) -> Self {
        Self(b)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for H256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Vec<u8>` as a hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as lowercase hex.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserialize bytes from hex (an optional `0x` prefix is accepted).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

/* ------------------------------- block traces ------------------------------ */

/// Header fields of an executed L2 block that the chunk commitment binds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: H256,
    /// Hash of the parent block.
    pub parent_hash: H256,
    /// State root after executing this block.
    pub state_root: H256,
    /// Block timestamp (seconds).
    pub timestamp: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
}

/// One transaction inside a block trace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionTrace {
    /// Transaction hash.
    pub tx_hash: H256,
    /// Whether this is an L1 message (excluded from `tx_bytes`).
    #[serde(default)]
    pub is_l1_msg: bool,
    /// Raw signed transaction payload.
    #[serde(with = "hex_bytes", default)]
    pub data: Vec<u8>,
}

/// Execution trace of a single block, as produced by the trace collector.
///
/// Only the fields the orchestration layer commits to are modeled; storage
/// proofs and opcode-level traces are consumed by the circuits alone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockTrace {
    /// Chain id the block belongs to.
    pub chain_id: u64,
    /// Block header.
    pub header: BlockHeader,
    /// State root before executing this block.
    pub prev_state_root: H256,
    /// Withdraw trie root after executing this block.
    pub withdraw_trie_root: H256,
    /// Transactions in execution order.
    #[serde(default)]
    pub transactions: Vec<TransactionTrace>,
}

impl BlockTrace {
    /// Block number shortcut.
    #[inline]
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.header.number
    }
}

/* ----------------------------- state transition ---------------------------- */

/// Public state-root transition carried by every proof level.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateTransition {
    /// Chain id.
    pub chain_id: u64,
    /// State root before the proven span.
    pub prev_state_root: H256,
    /// State root after the proven span.
    pub post_state_root: H256,
    /// Withdraw root after the proven span.
    pub withdraw_root: H256,
}

impl StateTransition {
    /// `true` if `next` starts exactly where `self` ends on the same chain.
    #[inline]
    #[must_use]
    pub fn chains_into(&self, next: &Self) -> bool {
        self.chain_id == next.chain_id && self.post_state_root == next.prev_state_root
    }

    /// Span from the start of `first` to the end of `last`.
    #[inline]
    #[must_use]
    pub const fn span(first: &Self, last: &Self) -> Self {
        Self {
            chain_id: first.chain_id,
            prev_state_root: first.prev_state_root,
            post_state_root: last.post_state_root,
            withdraw_root: last.withdraw_root,
        }
    }
}

/* -------------------------------- batch header ----------------------------- */

/// Metadata binding an ordered set of chunk hashes into one batch identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchHeader {
    /// Header codec version.
    pub version: u8,
    /// Index of this batch.
    pub batch_index: u64,
    /// Commitment of the parent batch.
    pub parent_batch_hash: H256,
    /// Number of L1 messages popped in this batch.
    #[serde(default)]
    pub l1_message_popped: u64,
    /// Total L1 messages popped up to and including this batch.
    #[serde(default)]
    pub total_l1_message_popped: u64,
    /// Timestamp of the last block in the batch.
    #[serde(default)]
    pub last_block_timestamp: u64,
    /// Chunk hashes in batch order. Order is significant.
    pub chunk_hashes: Vec<H256>,
}

impl BatchHeader {
    /// Commitment over every header field, including the ordered chunk list.
    #[must_use]
    pub fn batch_hash(&self) -> H256 {
        let mut h = LabeledHasher::new(Label::BatchHash);
        h.update(&[self.version])
            .update_u64(self.batch_index)
            .update(self.parent_batch_hash.as_bytes())
            .update_u64(self.l1_message_popped)
            .update_u64(self.total_l1_message_popped)
            .update_u64(self.last_block_timestamp)
            .update_u64(self.chunk_hashes.len() as u64);
        for c in &self.chunk_hashes {
            h.update(c.as_bytes());
        }
        H256(h.finalize())
    }
}

/* --------------------------- levels and versioning ------------------------- */

/// Proving level in the aggregation hierarchy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProofLevel {
    /// Contiguous run of blocks.
    Chunk,
    /// Aggregation of chunk proofs.
    Batch,
    /// Aggregation of batch proofs.
    Bundle,
}

impl ProofLevel {
    /// All levels, leaves first.
    pub const ALL: [Self; 3] = [Self::Chunk, Self::Batch, Self::Bundle];

    /// The level this one aggregates, if any.
    #[inline]
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Chunk => None,
            Self::Batch => Some(Self::Chunk),
            Self::Bundle => Some(Self::Batch),
        }
    }

    /// Lowercase name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Batch => "batch",
            Self::Bundle => "bundle",
        }
    }
}

impl fmt::Display for ProofLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chunk" => Ok(Self::Chunk),
            "batch" => Ok(Self::Batch),
            "bundle" => Ok(Self::Bundle),
            other => Err(format!("unknown proof level: {other}")),
        }
    }
}

/// Fork / circuit-version context a proof was produced under.
///
/// `None` on an axis means the producing level did not discriminate on it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionContext {
    /// Protocol fork name (e.g. `"bernoulli"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_name: Option<String>,
    /// Circuit version within the fork.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_version: Option<String>,
}

impl VersionContext {
    /// Context for a fork, without a circuit version.
    #[must_use]
    pub fn fork(name: impl Into<String>) -> Self {
        Self {
            fork_name: Some(name.into()),
            circuit_version: None,
        }
    }

    /// Context for a fork and circuit version.
    #[must_use]
    pub fn versioned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            fork_name: Some(name.into()),
            circuit_version: Some(version.into()),
        }
    }
}

impl fmt::Display for VersionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.fork_name.as_deref().unwrap_or("*"),
            self.circuit_version.as_deref().unwrap_or("*")
        )
    }
}
