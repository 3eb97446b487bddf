//! Block-trace envelope, synthetic generator and chunk partitioning.
//!
//! - `format`: a minimal, versioned envelope around an ordered block-trace list (`TraceFile`).
//! - `generator`: a deterministic synthetic chain generator for tests, demos and the CLI.
//! - `partition`: split a trace list into chunks and assemble the matching batch header.
//! - `io`: JSON/CBOR read/write helpers for `TraceFile`.
//!
//! Real traces come from the execution client; this crate only shapes them.
//! Callers import stable module paths like `zkagg_trace::partition::split_into_chunks`.

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

/// Versioned block-trace envelope.
pub mod format;
/// Deterministic synthetic chain generator.
pub mod generator;
/// JSON/CBOR I/O helpers for `TraceFile`.
pub mod io;
/// Chunk partitioning and batch header assembly.
pub mod partition;
