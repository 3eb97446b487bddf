//! File I/O for block traces, proofs and aggregation inputs.
//!
//! JSON and CBOR read/write with extension-based auto-detection. Unknown or
//! missing extensions are rejected for reads and default to JSON for writes.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::artifact::Proof;
use crate::types::{BatchHeader, BlockTrace};

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", path.display()))?;
        }
    }
    Ok(())
}

fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/* ------------------------------ generic codecs ----------------------------- */

/// Read any value from **JSON**.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize JSON from {}", path.display()))
}

/// Write any value to **JSON** (pretty).
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), v)
        .with_context(|| format!("serialize JSON to {}", path.display()))
}

/// Read any value from **CBOR**.
pub fn read_cbor<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    ciborium::de::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize CBOR from {}", path.display()))
}

/// Write any value to **CBOR**.
pub fn write_cbor<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    ciborium::ser::into_writer(v, BufWriter::new(f))
        .with_context(|| format!("serialize CBOR to {}", path.display()))
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_json(path),
        Some("cbor") => read_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_auto<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_cbor(path, v),
        _ => write_json(path, v),
    }
}

/* ------------------------------- typed helpers ----------------------------- */

/// Read an ordered list of block traces.
pub fn read_block_traces_auto<P: AsRef<Path>>(path: P) -> Result<Vec<BlockTrace>> {
    read_auto(path).context("reading block traces")
}

/// Write an ordered list of block traces.
pub fn write_block_traces_auto<P: AsRef<Path>>(path: P, v: &[BlockTrace]) -> Result<()> {
    write_auto(path, v)
}

/// Read one proof.
pub fn read_proof_auto<P: AsRef<Path>>(path: P) -> Result<Proof> {
    read_auto(path).context("reading proof")
}

/// Write one proof.
pub fn write_proof_auto<P: AsRef<Path>>(path: P, v: &Proof) -> Result<()> {
    write_auto(path, v)
}

/// Read a batch header.
pub fn read_batch_header_auto<P: AsRef<Path>>(path: P) -> Result<BatchHeader> {
    read_auto(path).context("reading batch header")
}

/// Dump `proof` as `<dir>/<name>.json`, creating `dir` if needed.
pub fn dump_proof(dir: &Path, name: &str, proof: &Proof) -> Result<()> {
    write_json(dir.join(format!("{name}.json")), proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StateTransition, VersionContext, H256};
    use crate::ProofLevel;

    fn proof() -> Proof {
        Proof {
            level: ProofLevel::Batch,
            context: VersionContext::fork("bernoulli"),
            transition: StateTransition {
                chain_id: 1,
                prev_state_root: H256([1; 32]),
                post_state_root: H256([2; 32]),
                withdraw_root: H256::ZERO,
            },
            public_input: H256([3; 32]),
            proof: vec![1; 64],
            vk: vec![2; 32],
            chunk_info: None,
            batch_hash: Some(H256([4; 32])),
            git_version: Some("0.1.0".into()),
            meta: serde_json::json!({"n_chunks": 1}),
        }
    }

    #[test]
    fn proof_json_and_cbor_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = proof();
        for name in ["p.json", "p.cbor"] {
            let path = dir.path().join("nested").join(name);
            write_proof_auto(&path, &p).unwrap();
            assert_eq!(read_proof_auto(&path).unwrap(), p);
        }
    }

    #[test]
    fn unknown_extension_is_rejected_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.bin");
        write_proof_auto(&path, &proof()).unwrap();
        assert!(read_proof_auto(&path).is_err());
    }

    #[test]
    fn dump_writes_named_json() {
        let dir = tempfile::tempdir().unwrap();
        dump_proof(dir.path(), "batch_7", &proof()).unwrap();
        let back: Proof = read_json(dir.path().join("batch_7.json")).unwrap();
        assert_eq!(back, proof());
    }
}
