//! Error taxonomy for orchestration, registry and extraction.
//!
//! Callers must be able to tell four situations apart, so each one is its own
//! variant rather than a message string:
//! - [`Error::Configuration`]: fatal, the process was set up wrong.
//! - [`Error::UnknownArtifact`]: the fork/version asked for is not loaded.
//! - [`Error::MalformedInput`]: inputs failed structural checks; fix and resubmit.
//! - [`Error::Backend`]: the proving engine itself failed.
//!
//! A proof that is well-formed but does not verify is **not** an error; the
//! verify operations return `Ok(false)` for it.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::{ArtifactKey, KeyScope, Role};
use crate::types::{ProofLevel, VersionContext, H256};

/// Coarse error category, stable across the FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation invoked before initialization, or bad asset directories.
    Configuration,
    /// Fork name / circuit version not loaded.
    UnknownArtifact,
    /// Inputs failed structural or consistency checks.
    MalformedInput,
    /// Internal proving/verification engine failure.
    Backend,
}

impl ErrorKind {
    /// Negative status code used by the C ABI.
    #[inline]
    #[must_use]
    pub const fn status_code(self) -> i8 {
        match self {
            Self::Configuration => -1,
            Self::UnknownArtifact => -2,
            Self::MalformedInput => -3,
            Self::Backend => -4,
        }
    }

    /// snake_case name used in JSON envelopes.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::UnknownArtifact => "unknown_artifact",
            Self::MalformedInput => "malformed_input",
            Self::Backend => "backend",
        }
    }
}

/// Fatal setup errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Prove/verify called for a level that was never initialized.
    #[error("{level} {role} is not initialized")]
    Uninitialized {
        /// Level that was asked for.
        level: ProofLevel,
        /// Prover or verifier side.
        role: Role,
    },

    /// A params/assets file is missing, unreadable or empty.
    #[error("failed to load {what} from {}: {reason}", .path.display())]
    AssetLoad {
        /// Offending path.
        path: PathBuf,
        /// What was being loaded.
        what: String,
        /// Underlying cause.
        reason: String,
    },

    /// The key was already loaded; entries are never replaced.
    #[error("{key} is already initialized")]
    AlreadyInitialized {
        /// Key that already has an artifact set.
        key: ArtifactKey,
    },

    /// A level's entries must all discriminate on the same axes.
    #[error("{level} artifacts are keyed {existing}, refusing an entry keyed {requested}")]
    ScopeConflict {
        /// Level being registered.
        level: ProofLevel,
        /// Scope fixed by the first registration.
        existing: KeyScope,
        /// Scope of the rejected registration.
        requested: KeyScope,
    },

    /// Config file could not be parsed or is inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Structural / consistency failures on caller-supplied inputs.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    /// No block traces were supplied.
    #[error("block trace list is empty")]
    EmptyTraces,

    /// Block numbers do not increase by exactly one.
    #[error("block numbers are not continuous at index {index}: got {prev} then {next}")]
    NonContiguousBlocks {
        /// Index of the later block.
        index: usize,
        /// Number of the earlier block.
        prev: u64,
        /// Number of the later block.
        next: u64,
    },

    /// A block's parent hash is not the previous block's hash.
    #[error("block at index {index} does not link to its predecessor: parent {actual}, expected {expected}")]
    BrokenParentLink {
        /// Index of the later block.
        index: usize,
        /// Hash of the previous block.
        expected: H256,
        /// Parent hash found.
        actual: H256,
    },

    /// A block's pre-state root is not the previous block's post-state root.
    #[error("state root mismatch at index {index}: expected {expected}, got {actual}")]
    StateRootMismatch {
        /// Index of the later block.
        index: usize,
        /// Post-state root of the previous block.
        expected: H256,
        /// Pre-state root found.
        actual: H256,
    },

    /// Items from different chains were mixed.
    #[error("chain id mismatch at index {index}: expected {expected}, got {actual}")]
    ChainIdMismatch {
        /// Offending index.
        index: usize,
        /// Chain id of the first item.
        expected: u64,
        /// Chain id found.
        actual: u64,
    },

    /// Two parallel lists have different lengths.
    #[error("size mismatch: {what} has {actual} entries, expected {expected}")]
    SizeMismatch {
        /// Which list is off.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// An aggregation input list is empty.
    #[error("{what} list is empty")]
    Empty {
        /// Which list.
        what: &'static str,
    },

    /// Too many chunks for one batch.
    #[error("batch has {count} chunks, maximum is {max}")]
    TooManyChunks {
        /// Supplied count.
        count: usize,
        /// Upper bound.
        max: usize,
    },

    /// A chunk hash appears at a different position than the header says.
    #[error("chunk at index {index} is out of order: header expects {expected}, got {actual}")]
    OutOfOrder {
        /// Offending index.
        index: usize,
        /// Hash the header lists at this index.
        expected: H256,
        /// Hash supplied at this index.
        actual: H256,
    },

    /// A chunk hash is not part of the batch at all, or a proof binds a different chunk.
    #[error("chunk hash mismatch at index {index}: expected {expected}, got {actual}")]
    ChunkHashMismatch {
        /// Offending index.
        index: usize,
        /// Expected hash.
        expected: H256,
        /// Hash found.
        actual: H256,
    },

    /// Consecutive aggregation inputs do not chain by state root.
    #[error("{level} inputs are not contiguous between index {} and {index}", .index.saturating_sub(1))]
    NonContiguous {
        /// Level of the inputs.
        level: ProofLevel,
        /// Index of the later input (always ≥ 1).
        index: usize,
    },

    /// A chunk proof failed the independent pre-check.
    #[error("chunk proof {index} is invalid: {reason}")]
    InvalidChunkProof {
        /// Offending index.
        index: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// A batch proof failed the bundle re-check.
    #[error("batch proof {index} is invalid: {reason}")]
    InvalidBatchProof {
        /// Offending index.
        index: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// Input decoding failed.
    #[error("failed to decode {what}: {reason}")]
    Decode {
        /// What was being decoded.
        what: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Proof envelope fails the format sanity check.
    #[error("malformed proof: {0}")]
    BadProof(String),
}

/// Top-level error returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal configuration problem.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The requested fork/version is not loaded for this level.
    #[error("unknown artifact: no {level} {role} loaded for {context}")]
    UnknownArtifact {
        /// Level asked for.
        level: ProofLevel,
        /// Prover or verifier side.
        role: Role,
        /// Requested fork/version.
        context: VersionContext,
    },

    /// Inputs failed checks.
    #[error(transparent)]
    MalformedInput(#[from] MalformedInputError),

    /// The proof backend failed.
    #[error("backend error: {0:#}")]
    Backend(anyhow::Error),
}

impl Error {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::UnknownArtifact { .. } => ErrorKind::UnknownArtifact,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Shorthand for a decode failure.
    pub fn decode(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedInput(MalformedInputError::Decode {
            what,
            reason: reason.to_string(),
        })
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
