//! zkagg-core — data model, artifact registry and the chunk → batch → bundle
//! proving hierarchy.
//!
//! This crate defines the **stable boundary** used across zkagg crates:
//! - canonical data types (`BlockTrace`, `ChunkInfo`, `BatchHeader`, `Proof`, …),
//! - the versioned [`ArtifactRegistry`] keyed by `(level, fork, circuit version)`,
//! - the stateless [`ProofBackend`] trait and the reference [`DigestBackend`],
//! - the [`Prover`] / [`Verifier`] façades and the [`ProofService`] pairing them,
//! - JSON/CBOR I/O and TOML/JSON configuration.
//!
//! ```no_run
//! use zkagg_core::{DigestBackend, ProofLevel, ProofService, Role, VersionContext};
//! # let traces: Vec<zkagg_core::BlockTrace> = vec![];
//! let svc = ProofService::<DigestBackend>::default();
//! let (params, assets) = (std::path::Path::new("params"), std::path::Path::new("assets"));
//! for role in [Role::Prover, Role::Verifier] {
//!     svc.init(role, ProofLevel::Chunk, VersionContext::fork("bernoulli"), params, assets)?;
//! }
//! let proof = svc.prover().prove_chunk(&traces)?;
//! assert!(svc.verifier().verify_chunk(&proof, Some("bernoulli"), None)?);
//! # Ok::<(), zkagg_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Proof envelope shared by all levels.
pub mod artifact;
/// Stateless backend trait and the reference digest backend.
pub mod backend;
/// Public-input bindings of aggregated proofs.
pub mod binding;
/// ChunkInfo extraction from block traces.
pub mod chunk_info;
/// TOML/JSON configuration and environment overrides.
pub mod config;
/// Error taxonomy.
pub mod error;
/// JSON/CBOR file helpers with extension auto-detection.
pub mod io;
/// Chunk proving and batch/bundle aggregation.
pub mod prover;
/// Versioned artifact registry.
pub mod registry;
/// Prover + verifier pair used by frontends.
pub mod service;
/// Canonical core data types.
pub mod types;
/// Verification dispatch.
pub mod verifier;

pub use artifact::{Proof, PROOF_WORD_SIZE};
pub use backend::{DigestBackend, ProofBackend, Witness};
pub use chunk_info::{chunk_hash, derive, ChunkInfo};
pub use config::{
    load_config_auto, CircuitConfig, CircuitEntry, ServiceConfig, ServiceOptions, VerifierConfig,
};
pub use error::{ConfigurationError, Error, ErrorKind, MalformedInputError, Result};
pub use prover::{Prover, MAX_AGG_CHUNKS};
pub use registry::{ArtifactKey, ArtifactRegistry, ArtifactSet, KeyScope, LevelState, Role};
pub use service::ProofService;
pub use types::*;
pub use verifier::Verifier;

/// Version string stamped into every generated proof.
pub const GIT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly-used items for quick imports.
///
/// ```rust
/// use zkagg_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        backend::{DigestBackend, ProofBackend},
        error::{Error, ErrorKind, Result},
        service::ProofService,
        types::*,
        ChunkInfo, Proof, Role,
    };
}
