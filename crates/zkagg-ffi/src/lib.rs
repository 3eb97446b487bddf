//! zkagg-ffi — C ABI gateway over the zkagg proving hierarchy.
//!
//! The library holds one process-wide [`zkagg_core::ProofService`] and exposes
//! it through `extern "C"` symbols (feature `cabi`, on by default):
//!
//! | symbol | returns |
//! |---|---|
//! | `init_{chunk,batch,bundle}_{prover,verifier}`, `init_verifiers` | `int` status |
//! | `get_{chunk,batch,bundle}_vk` | owned JSON envelope, hex VK in `message` |
//! | `block_traces_to_chunk_info`, `check_chunk_proofs` | owned JSON envelope |
//! | `gen_{chunk,batch,bundle}_proof` | owned JSON envelope, proof JSON in `message` |
//! | `verify_{chunk,batch,bundle}_proof` | `char`: `1` valid, `0` invalid, `<0` error |
//! | `free_c_chars` | releases an owned envelope |
//!
//! Negative statuses: `-1` configuration, `-2` unknown artifact,
//! `-3` malformed input, `-4` backend.
//!
//! ### Minimal C usage
//! ```c
//! int rc = init_chunk_prover("params", "assets", "bernoulli", NULL);
//! char* env = gen_chunk_proof(traces_json);
//! /* ... parse env ... */
//! free_c_chars(env);
//! ```
//!
//! Every entry point contains panics; an unwinding panic surfaces as a backend
//! error. Build without `panic = "abort"` for that to hold.

#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

/// Owned buffers and the live-buffer counter.
pub mod buffer;
/// JSON result envelope.
pub mod envelope;
/// Safe operations behind the exported symbols.
pub mod gateway;
/// Lazy tracing subscriber.
pub mod logging;

#[cfg(feature = "cabi")]
pub mod cabi;

pub use buffer::{owned_buffer_count, OwnedBuffer};
pub use envelope::Envelope;

#[cfg(feature = "cabi")]
pub use cabi::{free_c_chars, zkagg_abi_version, zkagg_version, ZKAGG_FFI_ABI_VERSION};
