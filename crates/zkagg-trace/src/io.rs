//! I/O helpers for the `TraceFile` envelope.
//!
//! Supports JSON/CBOR and extension-based auto-detection. A bare JSON array of
//! block traces is also accepted on read, since that is what trace collectors emit.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;
use zkagg_core::BlockTrace;

use crate::format::TraceFile;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTraces {
    Envelope(TraceFile),
    Bare(Vec<BlockTrace>),
}

/* ---------------- JSON ---------------- */

/// Read a `TraceFile` (or a bare block-trace array) from **JSON**.
pub fn read_trace_json<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let v: JsonTraces = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize JSON trace file {}", path.display()))?;
    Ok(match v {
        JsonTraces::Envelope(tf) => tf,
        JsonTraces::Bare(blocks) => TraceFile::new(blocks),
    })
}

/// Write a `TraceFile` to **JSON** (pretty).
pub fn write_trace_json<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).context("serialize JSON trace file")?;
    w.flush().context("flush JSON writer")?;
    Ok(())
}

/* ---------------- CBOR ---------------- */

/// Read a `TraceFile` from **CBOR**.
pub fn read_trace_cbor<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    ciborium::de::from_reader(BufReader::new(f))
        .with_context(|| format!("deserialize CBOR trace file {}", path.display()))
}

/// Write a `TraceFile` to **CBOR**.
pub fn write_trace_cbor<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).context("serialize CBOR trace file")?;
    w.flush().context("flush CBOR writer")?;
    Ok(())
}

/* --------------- Auto-detect by extension --------------- */

/// Auto-detect **read** by extension (`.json` / `.cbor`, case-insensitive).
pub fn read_trace_auto<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_trace_json(path),
        Some("cbor") => read_trace_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported trace extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect **write** (defaults to JSON if unknown/missing).
pub fn write_trace_auto<P: AsRef<Path>>(path: P, v: &TraceFile) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_trace_cbor(path, v),
        _ => write_trace_json(path, v),
    }
}

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
