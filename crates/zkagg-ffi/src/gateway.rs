//! Safe Rust half of the C ABI: one process-wide [`ProofService`] and the
//! operations the exported symbols forward to.
//!
//! Every operation checks the level guard before decoding its input, so a
//! call against an uninitialized level reports a configuration error whatever
//! it was given. Chunk-info derivation is the exception: it is pure and never
//! touches the registry.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use tracing::{debug, info};
use zkagg_core::{
    BatchHeader, BlockTrace, ChunkInfo, DigestBackend, Error, Proof, ProofLevel,
    ProofService, Result, Role, ServiceOptions, VerifierConfig, VersionContext,
};

use crate::envelope::Envelope;
use crate::logging;

/// Backend behind the exported symbols.
pub type Backend = DigestBackend;

static SERVICE: OnceLock<ProofService<Backend>> = OnceLock::new();

/// The process-wide service, created on first use with environment overrides applied.
pub fn service() -> &'static ProofService<Backend> {
    SERVICE.get_or_init(|| ProofService::new(ServiceOptions::default().with_env()))
}

/* ------------------------------ status codes ----------------------------- */

/// `init_*` status: `0` on success, the error kind's negative code otherwise.
#[must_use]
pub fn init_status(r: &Result<()>) -> i32 {
    match r {
        Ok(()) => 0,
        Err(e) => i32::from(e.kind().status_code()),
    }
}

/// `verify_*` status: `1` valid, `0` invalid, the error kind's negative code otherwise.
#[must_use]
pub fn verify_status(r: &Result<bool>) -> i8 {
    match r {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => e.kind().status_code(),
    }
}

/// Run `f`, turning an unwinding panic into [`Error::Backend`].
pub fn contain<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|p| {
        let msg = panic_message(p.as_ref());
        tracing::error!(%msg, "panic caught at the boundary");
        Err(Error::Backend(anyhow::anyhow!("panic: {msg}")))
    })
}

fn panic_message(p: &(dyn Any + Send)) -> String {
    p.downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| p.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn decode<T: DeserializeOwned>(what: &'static str, json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::decode(what, e))
}

fn encode<T: serde::Serialize>(what: &'static str, v: &T) -> Result<String> {
    serde_json::to_string(v).map_err(|e| Error::decode(what, e))
}

fn envelope(r: Result<String>) -> Envelope {
    if let Err(e) = &r {
        debug!(kind = e.kind().as_str(), error = %e, "gateway call failed");
    }
    Envelope::from(r)
}

/* --------------------------------- init --------------------------------- */

/// Load `level` artifacts for `role`.
pub fn init(
    role: Role,
    level: ProofLevel,
    params_dir: &str,
    assets_dir: &str,
    fork_name: Option<&str>,
    circuit_version: Option<&str>,
) -> Result<()> {
    logging::init();
    let context = VersionContext {
        fork_name: fork_name.map(str::to_owned),
        circuit_version: circuit_version.map(str::to_owned),
    };
    info!(%role, %level, %context, params_dir, assets_dir, "init requested");
    service().init(role, level, context, Path::new(params_dir), Path::new(assets_dir))
}

/// Load the low and high version circuits from a [`VerifierConfig`] JSON document.
pub fn init_verifiers(config_json: &str) -> Result<()> {
    logging::init();
    let config = VerifierConfig::from_json(config_json)?;
    service().init_verifiers(&config)
}

/* ------------------------------- queries -------------------------------- */

/// Hex verifying key of the active `level` prover.
pub fn get_vk(level: ProofLevel) -> Envelope {
    envelope(service().get_vk(level).map(hex::encode))
}

/// Derive the [`ChunkInfo`] of JSON block traces.
pub fn block_traces_to_chunk_info(traces_json: &str) -> Envelope {
    envelope((|| {
        let traces: Vec<BlockTrace> = decode("block traces", traces_json)?;
        let info = ChunkInfo::from_block_traces(&traces)?;
        encode("chunk info", &info)
    })())
}

/// Pre-check JSON chunk proofs against the batch prover's chunk key.
pub fn check_chunk_proofs(proofs_json: &str) -> Envelope {
    envelope((|| {
        let svc = service();
        svc.prover().registry().ensure_ready(ProofLevel::Batch)?;
        let proofs: Vec<Proof> = decode("chunk proofs", proofs_json)?;
        svc.prover().check_chunk_proofs(&proofs)?;
        Ok(proofs.len().to_string())
    })())
}

/* -------------------------------- prove --------------------------------- */

/// Prove a chunk from JSON block traces.
pub fn gen_chunk_proof(traces_json: &str) -> Envelope {
    envelope((|| {
        let svc = service();
        svc.prover().registry().ensure_ready(ProofLevel::Chunk)?;
        let traces: Vec<BlockTrace> = decode("block traces", traces_json)?;
        let proof = svc.prover().prove_chunk(&traces)?;
        encode("chunk proof", &proof)
    })())
}

/// Aggregate JSON chunk infos, chunk proofs and a batch header into a batch proof.
pub fn gen_batch_proof(infos_json: &str, proofs_json: &str, header_json: &str) -> Envelope {
    envelope((|| {
        let svc = service();
        svc.prover().registry().ensure_ready(ProofLevel::Batch)?;
        let infos: Vec<ChunkInfo> = decode("chunk infos", infos_json)?;
        let proofs: Vec<Proof> = decode("chunk proofs", proofs_json)?;
        let header: BatchHeader = decode("batch header", header_json)?;
        let proof = svc.prover().prove_batch(&infos, &proofs, &header)?;
        encode("batch proof", &proof)
    })())
}

/// Aggregate JSON batch proofs into a bundle proof.
pub fn gen_bundle_proof(proofs_json: &str) -> Envelope {
    envelope((|| {
        let svc = service();
        svc.prover().registry().ensure_ready(ProofLevel::Bundle)?;
        let proofs: Vec<Proof> = decode("batch proofs", proofs_json)?;
        let proof = svc.prover().prove_bundle(&proofs)?;
        encode("bundle proof", &proof)
    })())
}

/* -------------------------------- verify -------------------------------- */

/// Verify a JSON proof at `level` under the requested fork/version.
pub fn verify_proof(
    level: ProofLevel,
    proof_json: &str,
    fork_name: Option<&str>,
    circuit_version: Option<&str>,
) -> Result<bool> {
    service()
        .verifier()
        .verify_json(level, proof_json.as_bytes(), fork_name, circuit_version)
}
