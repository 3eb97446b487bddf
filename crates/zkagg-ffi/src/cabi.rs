//! Exported `extern "C"` symbols.
//!
//! Conventions:
//! - string arguments are NUL-terminated UTF-8; optional ones (fork name,
//!   circuit version) may be NULL or empty,
//! - `init_*` return `0` or a negative status, `verify_*_proof` return
//!   `1`/`0` or a negative status (see [`crate::gateway`]),
//! - every other call returns an owned JSON envelope the caller must pass to
//!   [`free_c_chars`] exactly once.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::OnceLock;

use zkagg_core::{Error, ProofLevel, Result, Role};

use crate::buffer::OwnedBuffer;
use crate::envelope::Envelope;
use crate::gateway::{self, contain};

/// C ABI contract version; bumped only on breaking symbol or envelope changes.
pub const ZKAGG_FFI_ABI_VERSION: u32 = 1;

static VERSION_CSTR: OnceLock<CString> = OnceLock::new();

/// Borrow a required string argument.
///
/// # Safety
/// `p` must be NULL or point to a NUL-terminated string valid for `'a`.
unsafe fn arg_str<'a>(what: &'static str, p: *const c_char) -> Result<&'a str> {
    if p.is_null() {
        return Err(Error::decode(what, "null pointer"));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|e| Error::decode(what, e))
}

/// Borrow an optional string argument; NULL and empty both mean "not given".
///
/// # Safety
/// As [`arg_str`].
unsafe fn opt_str<'a>(what: &'static str, p: *const c_char) -> Result<Option<&'a str>> {
    if p.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded caller contract.
    let s = unsafe { arg_str(what, p) }?;
    Ok((!s.is_empty()).then_some(s))
}

fn envelope_out(f: impl FnOnce() -> Result<Envelope>) -> *mut c_char {
    contain(f)
        .unwrap_or_else(|e| Envelope::from(Err::<String, _>(e)))
        .into_buffer()
        .into_raw()
}

/* --------------------------------- init --------------------------------- */

unsafe fn init_level(
    role: Role,
    level: ProofLevel,
    params_dir: *const c_char,
    assets_dir: *const c_char,
    fork_name: *const c_char,
    circuit_version: *const c_char,
) -> c_int {
    let r = contain(|| {
        // SAFETY: forwarded caller contract of the exported init functions.
        let (params, assets, fork, version) = unsafe {
            (
                arg_str("params_dir", params_dir)?,
                arg_str("assets_dir", assets_dir)?,
                opt_str("fork_name", fork_name)?,
                opt_str("circuit_version", circuit_version)?,
            )
        };
        gateway::init(role, level, params, assets, fork, version)
    });
    gateway::init_status(&r)
}

macro_rules! export_init {
    ($name:ident, $role:expr, $level:expr, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Safety
        /// `params_dir` and `assets_dir` must be valid NUL-terminated strings;
        /// `fork_name` and `circuit_version` must be NULL or valid NUL-terminated strings.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            params_dir: *const c_char,
            assets_dir: *const c_char,
            fork_name: *const c_char,
            circuit_version: *const c_char,
        ) -> c_int {
            // SAFETY: forwarded caller contract.
            unsafe {
                init_level(
                    $role,
                    $level,
                    params_dir,
                    assets_dir,
                    fork_name,
                    circuit_version,
                )
            }
        }
    };
}

export_init!(init_chunk_prover, Role::Prover, ProofLevel::Chunk, "Load chunk prover artifacts.");
export_init!(init_batch_prover, Role::Prover, ProofLevel::Batch, "Load batch prover artifacts.");
export_init!(init_bundle_prover, Role::Prover, ProofLevel::Bundle, "Load bundle prover artifacts.");
export_init!(init_chunk_verifier, Role::Verifier, ProofLevel::Chunk, "Load chunk verifier artifacts.");
export_init!(init_batch_verifier, Role::Verifier, ProofLevel::Batch, "Load batch verifier artifacts.");
export_init!(init_bundle_verifier, Role::Verifier, ProofLevel::Bundle, "Load bundle verifier artifacts.");

/// Load the low and high version verifier circuits from a JSON config.
///
/// # Safety
/// `config` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn init_verifiers(config: *const c_char) -> c_int {
    let r = contain(|| {
        // SAFETY: caller contract.
        let js = unsafe { arg_str("verifier config", config) }?;
        gateway::init_verifiers(js)
    });
    gateway::init_status(&r)
}

/* ------------------------------- queries -------------------------------- */

/// Hex chunk verifying key of the active chunk prover, as an owned envelope.
#[no_mangle]
pub extern "C" fn get_chunk_vk() -> *mut c_char {
    envelope_out(|| Ok(gateway::get_vk(ProofLevel::Chunk)))
}

/// Hex batch verifying key of the active batch prover, as an owned envelope.
#[no_mangle]
pub extern "C" fn get_batch_vk() -> *mut c_char {
    envelope_out(|| Ok(gateway::get_vk(ProofLevel::Batch)))
}

/// Hex bundle verifying key of the active bundle prover, as an owned envelope.
#[no_mangle]
pub extern "C" fn get_bundle_vk() -> *mut c_char {
    envelope_out(|| Ok(gateway::get_vk(ProofLevel::Bundle)))
}

/// Derive the chunk info of JSON block traces. Needs no initialization.
///
/// # Safety
/// `block_traces` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn block_traces_to_chunk_info(block_traces: *const c_char) -> *mut c_char {
    envelope_out(|| {
        // SAFETY: caller contract.
        let js = unsafe { arg_str("block traces", block_traces) }?;
        Ok(gateway::block_traces_to_chunk_info(js))
    })
}

/// Pre-check JSON chunk proofs; the envelope message is the number checked.
///
/// # Safety
/// `chunk_proofs` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn check_chunk_proofs(chunk_proofs: *const c_char) -> *mut c_char {
    envelope_out(|| {
        // SAFETY: caller contract.
        let js = unsafe { arg_str("chunk proofs", chunk_proofs) }?;
        Ok(gateway::check_chunk_proofs(js))
    })
}

/* -------------------------------- prove --------------------------------- */

/// Prove a chunk from JSON block traces.
///
/// # Safety
/// `block_traces` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn gen_chunk_proof(block_traces: *const c_char) -> *mut c_char {
    envelope_out(|| {
        // SAFETY: caller contract.
        let js = unsafe { arg_str("block traces", block_traces) }?;
        Ok(gateway::gen_chunk_proof(js))
    })
}

/// Aggregate chunk proofs into a batch proof.
///
/// # Safety
/// Every argument must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn gen_batch_proof(
    chunk_infos: *const c_char,
    chunk_proofs: *const c_char,
    batch_header: *const c_char,
) -> *mut c_char {
    envelope_out(|| {
        // SAFETY: caller contract.
        let (infos, proofs, header) = unsafe {
            (
                arg_str("chunk infos", chunk_infos)?,
                arg_str("chunk proofs", chunk_proofs)?,
                arg_str("batch header", batch_header)?,
            )
        };
        Ok(gateway::gen_batch_proof(infos, proofs, header))
    })
}

/// Aggregate batch proofs, in order, into a bundle proof.
///
/// # Safety
/// `batch_proofs` must be NULL or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn gen_bundle_proof(batch_proofs: *const c_char) -> *mut c_char {
    envelope_out(|| {
        // SAFETY: caller contract.
        let js = unsafe { arg_str("batch proofs", batch_proofs) }?;
        Ok(gateway::gen_bundle_proof(js))
    })
}

/* -------------------------------- verify -------------------------------- */

unsafe fn verify_level(
    level: ProofLevel,
    proof: *const c_char,
    fork_name: *const c_char,
    circuit_version: *const c_char,
) -> c_char {
    let r = contain(|| {
        // SAFETY: forwarded caller contract of the exported verify functions.
        let (proof, fork, version) = unsafe {
            (
                arg_str("proof", proof),
                opt_str("fork_name", fork_name)?,
                opt_str("circuit_version", circuit_version)?,
            )
        };
        // Uninitialized beats undecodable input.
        gateway::service().verifier().registry().ensure_ready(level)?;
        gateway::verify_proof(level, proof?, fork, version)
    });
    to_c_char(gateway::verify_status(&r))
}

// `c_char` is `i8` or `u8` depending on the target; callers read the byte as signed.
#[allow(clippy::cast_sign_loss, clippy::unnecessary_cast)]
const fn to_c_char(v: i8) -> c_char {
    v as c_char
}

macro_rules! export_verify {
    ($name:ident, $level:expr, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Safety
        /// `proof` must be a valid NUL-terminated string; `fork_name` and
        /// `circuit_version` must be NULL or valid NUL-terminated strings.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            proof: *const c_char,
            fork_name: *const c_char,
            circuit_version: *const c_char,
        ) -> c_char {
            // SAFETY: forwarded caller contract.
            unsafe { verify_level($level, proof, fork_name, circuit_version) }
        }
    };
}

export_verify!(verify_chunk_proof, ProofLevel::Chunk, "Verify a JSON chunk proof.");
export_verify!(verify_batch_proof, ProofLevel::Batch, "Verify a JSON batch proof.");
export_verify!(verify_bundle_proof, ProofLevel::Bundle, "Verify a JSON bundle proof.");

/* ------------------------------- ownership ------------------------------ */

/// Release a buffer returned by this library. NULL is a no-op.
///
/// # Safety
/// `ptr` must be NULL or a pointer returned by this library that has not been
/// released yet. Releasing the same pointer twice is undefined behavior.
#[no_mangle]
pub unsafe extern "C" fn free_c_chars(ptr: *mut c_char) {
    // SAFETY: caller contract.
    drop(unsafe { OwnedBuffer::from_raw(ptr) });
}

/// Number of owned buffers handed out and not yet released.
#[no_mangle]
pub extern "C" fn zkagg_owned_buffer_count() -> usize {
    crate::buffer::owned_buffer_count()
}

/* -------------------------------- version ------------------------------- */

/// Stable ABI contract version (not the crate version).
#[no_mangle]
pub extern "C" fn zkagg_abi_version() -> u32 {
    ZKAGG_FFI_ABI_VERSION
}

/// Static NUL-terminated crate version. The caller must not free it.
#[no_mangle]
pub extern "C" fn zkagg_version() -> *const c_char {
    VERSION_CSTR
        .get_or_init(|| OwnedBuffer::new(env!("CARGO_PKG_VERSION")).as_c_str().to_owned())
        .as_ptr()
}
