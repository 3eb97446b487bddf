//! Service configuration: which circuits to load, from where, for which role.
//!
//! Files are TOML or JSON, picked by extension ([`load_config_auto`]):
//!
//! ```toml
//! [options]
//! recheck_batch_proofs = true
//!
//! [[circuits]]
//! fork_name = "bernoulli"
//! params_path = "/data/params"
//! assets_path = "/data/assets/bernoulli"
//! levels = ["chunk", "batch", "bundle"]
//! roles = ["prover", "verifier"]
//! unversioned = ["bundle"]
//! ```
//!
//! Environment overrides (applied by [`ServiceOptions::with_env`]):
//! - `ZKAGG_OUTPUT_DIR`: also dump every generated proof as JSON there.
//! - `ZKAGG_RECHECK_BATCH_PROOFS`: `0`/`false`/`off` disables the bundle re-check.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::registry::Role;
use crate::types::{ProofLevel, VersionContext};

/// Env var naming the proof dump directory.
pub const ENV_OUTPUT_DIR: &str = "ZKAGG_OUTPUT_DIR";
/// Env var toggling the bundle-level batch proof re-check.
pub const ENV_RECHECK_BATCH_PROOFS: &str = "ZKAGG_RECHECK_BATCH_PROOFS";

/// Where one fork's circuit artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CircuitConfig {
    /// Protocol fork served by these artifacts.
    pub fork_name: String,
    /// Circuit version within the fork, when the deployment discriminates on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_version: Option<String>,
    /// Directory holding `params<degree>` files.
    pub params_path: PathBuf,
    /// Directory holding `vk_<level>.vkey` files.
    pub assets_path: PathBuf,
}

impl CircuitConfig {
    /// Version context these artifacts are registered under.
    #[must_use]
    pub fn context(&self) -> VersionContext {
        VersionContext {
            fork_name: Some(self.fork_name.clone()),
            circuit_version: self.circuit_version.clone(),
        }
    }
}

/// Verifier pair for the fork transition window: the outgoing and incoming circuit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Circuit of the outgoing fork.
    pub low_version_circuit: CircuitConfig,
    /// Circuit of the incoming fork.
    pub high_version_circuit: CircuitConfig,
}

impl VerifierConfig {
    /// Parse from a JSON string (the FFI wire form).
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| ConfigurationError::InvalidConfig(format!("verifier config: {e}")).into())
    }

    /// Both circuits, low first.
    #[must_use]
    pub fn circuits(&self) -> [&CircuitConfig; 2] {
        [&self.low_version_circuit, &self.high_version_circuit]
    }
}

fn all_levels() -> Vec<ProofLevel> {
    ProofLevel::ALL.to_vec()
}

fn all_roles() -> Vec<Role> {
    vec![Role::Prover, Role::Verifier]
}

/// One entry of a [`ServiceConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CircuitEntry {
    /// Artifact locations and version context.
    #[serde(flatten)]
    pub circuit: CircuitConfig,
    /// Levels to load from these locations.
    #[serde(default = "all_levels")]
    pub levels: Vec<ProofLevel>,
    /// Registries to load into.
    #[serde(default = "all_roles")]
    pub roles: Vec<Role>,
    /// Levels registered fork-invariant (no fork or version axis).
    #[serde(default)]
    pub unversioned: Vec<ProofLevel>,
}

impl CircuitEntry {
    /// Version context `level` is registered under for this entry.
    #[must_use]
    pub fn context_for(&self, level: ProofLevel) -> VersionContext {
        if self.unversioned.contains(&level) {
            VersionContext::default()
        } else {
            self.circuit.context()
        }
    }
}

/// Runtime knobs of the orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceOptions {
    /// Re-verify every batch proof before bundling.
    pub recheck_batch_proofs: bool,
    /// Dump every generated proof as JSON into this directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            recheck_batch_proofs: true,
            output_dir: None,
        }
    }
}

impl ServiceOptions {
    /// Apply environment overrides on top of `self`.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Some(dir) = std::env::var_os(ENV_OUTPUT_DIR) {
            if !dir.is_empty() {
                self.output_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(v) = std::env::var(ENV_RECHECK_BATCH_PROOFS) {
            match v.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" | "no" => self.recheck_batch_proofs = false,
                "1" | "true" | "on" | "yes" => self.recheck_batch_proofs = true,
                _ => {}
            }
        }
        self
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Orchestration options.
    #[serde(default)]
    pub options: ServiceOptions,
    /// Circuits to load, in order.
    #[serde(default)]
    pub circuits: Vec<CircuitEntry>,
}

impl From<&VerifierConfig> for ServiceConfig {
    fn from(v: &VerifierConfig) -> Self {
        Self {
            options: ServiceOptions::default(),
            circuits: v
                .circuits()
                .into_iter()
                .map(|c| CircuitEntry {
                    circuit: c.clone(),
                    levels: all_levels(),
                    roles: vec![Role::Verifier],
                    unversioned: Vec::new(),
                })
                .collect(),
        }
    }
}

fn parse_with<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let parsed = match ext.as_deref() {
        Some("toml") => toml::from_str(text).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str(text).map_err(|e| e.to_string()),
        other => Err(format!(
            "unsupported config extension {other:?} (supported: .toml, .json)"
        )),
    };
    parsed.map_err(|e| ConfigurationError::InvalidConfig(format!("{}: {e}", path.display())).into())
}

/// Load a config file, TOML or JSON by extension.
pub fn load_config_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::AssetLoad {
        path: path.to_path_buf(),
        what: "config file".into(),
        reason: e.to_string(),
    })?;
    parse_with(path, &text)
}
