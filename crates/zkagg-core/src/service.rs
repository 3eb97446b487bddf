//! Prover + verifier pair sharing one backend type, initialized from config.
//!
//! This is the object frontends (CLI, FFI) hold. Initialization is expected
//! to complete before the service is shared across threads; afterwards every
//! method takes `&self` and only reads the registries.

use std::path::Path;

use tracing::{debug, info};

use crate::artifact::Proof;
use crate::backend::ProofBackend;
use crate::config::{CircuitConfig, ServiceConfig, ServiceOptions, VerifierConfig};
use crate::error::Result;
use crate::prover::Prover;
use crate::registry::{LevelState, Role};
use crate::types::{ProofLevel, VersionContext};
use crate::verifier::Verifier;

/// Prover and verifier over backend `B`.
#[derive(Debug)]
pub struct ProofService<B: ProofBackend> {
    prover: Prover<B>,
    verifier: Verifier<B>,
}

impl<B: ProofBackend> Default for ProofService<B> {
    fn default() -> Self {
        Self::new(ServiceOptions::default())
    }
}

impl<B: ProofBackend> ProofService<B> {
    /// Empty service; every level of both roles starts `Uninitialized`.
    #[must_use]
    pub fn new(options: ServiceOptions) -> Self {
        Self {
            prover: Prover::new(options),
            verifier: Verifier::new(),
        }
    }

    /// Build and load everything `config` lists; env overrides apply to its options.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let svc = Self::new(config.options.clone().with_env());
        svc.load(config)?;
        Ok(svc)
    }

    /// Prover half.
    #[inline]
    #[must_use]
    pub const fn prover(&self) -> &Prover<B> {
        &self.prover
    }

    /// Verifier half.
    #[inline]
    #[must_use]
    pub const fn verifier(&self) -> &Verifier<B> {
        &self.verifier
    }

    /// State of `level` in the `role` registry.
    #[must_use]
    pub fn state(&self, role: Role, level: ProofLevel) -> LevelState {
        match role {
            Role::Prover => self.prover.registry().state(level),
            Role::Verifier => self.verifier.registry().state(level),
        }
    }

    /// Load one level for one role.
    pub fn init(
        &self,
        role: Role,
        level: ProofLevel,
        context: VersionContext,
        params_dir: &Path,
        assets_dir: &Path,
    ) -> Result<()> {
        match role {
            Role::Prover => self.prover.init(level, context, params_dir, assets_dir)?,
            Role::Verifier => self.verifier.init(level, context, params_dir, assets_dir)?,
        };
        Ok(())
    }

    /// Load `level` for `role` from a circuit config.
    pub fn init_circuit(&self, role: Role, level: ProofLevel, circuit: &CircuitConfig) -> Result<()> {
        self.init(
            role,
            level,
            circuit.context(),
            &circuit.params_path,
            &circuit.assets_path,
        )
    }

    /// Load the low and high version circuits into the verifier, every level.
    pub fn init_verifiers(&self, config: &VerifierConfig) -> Result<()> {
        self.load(&ServiceConfig::from(config))
    }

    /// Load every entry of `config`.
    ///
    /// Fork-invariant levels listed by several entries are loaded once.
    pub fn load(&self, config: &ServiceConfig) -> Result<()> {
        for entry in &config.circuits {
            for &role in &entry.roles {
                for &level in &entry.levels {
                    let context = entry.context_for(level);
                    if context == VersionContext::default()
                        && self.state(role, level) == LevelState::Ready
                    {
                        debug!(%role, %level, "fork-invariant level already loaded");
                        continue;
                    }
                    self.init(
                        role,
                        level,
                        context,
                        &entry.circuit.params_path,
                        &entry.circuit.assets_path,
                    )?;
                }
            }
        }
        info!(
            provers = self.prover.registry().keys().len(),
            verifiers = self.verifier.registry().keys().len(),
            "service configured"
        );
        Ok(())
    }

    /// Verifying key of the active `level` prover.
    pub fn get_vk(&self, level: ProofLevel) -> Result<Vec<u8>> {
        self.prover.vk(level)
    }

    /// Verify `proof` at `level` (see [`Verifier::verify`]).
    pub fn verify(
        &self,
        level: ProofLevel,
        proof: &Proof,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<bool> {
        self.verifier.verify(level, proof, fork_name, circuit_version)
    }
}
