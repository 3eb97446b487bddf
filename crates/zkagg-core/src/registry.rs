//! Artifact Registry: loaded params + verifying keys per `(level, fork, version)`.
//!
//! Lifecycle:
//! - Entries are loaded by [`ArtifactRegistry::initialize`] (or injected with
//!   [`ArtifactRegistry::insert`]) and then live for the registry's lifetime.
//! - Entries are immutable and shared as `Arc<ArtifactSet>`; an existing key is
//!   never replaced (`AlreadyInitialized`).
//! - A level is [`LevelState::Ready`] once it holds at least one entry. There is
//!   no way back to `Uninitialized`.
//!
//! Each level discriminates on a fixed set of axes ([`KeyScope`]), set by its
//! first registration. Lookups project the requested `(fork, version)` onto
//! that scope; an absent entry is `UnknownArtifact`, never a default key.
//!
//! On-disk layout:
//! ```text
//! <params_dir>/params<degree>       one file per degree the level needs
//! <assets_dir>/vk_<level>.vkey      verifying key of the level
//! ```
//! Aggregating provers also read the verifying key of the level below from the
//! same assets directory, so they can re-check their inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigurationError, Error, Result};
use crate::types::{ProofLevel, VersionContext};

/// Params degrees needed by the chunk circuit.
pub const CHUNK_DEGREES: &[u32] = &[20, 24];
/// Params degrees needed by the aggregation (batch/bundle) circuits.
pub const AGG_DEGREES: &[u32] = &[21, 26];

/// Params degrees required for `level`, ascending.
#[must_use]
pub const fn required_degrees(level: ProofLevel) -> &'static [u32] {
    match level {
        ProofLevel::Chunk => CHUNK_DEGREES,
        ProofLevel::Batch | ProofLevel::Bundle => AGG_DEGREES,
    }
}

/// File name of the verifying key for `level` inside an assets directory.
#[must_use]
pub fn vk_file_name(level: ProofLevel) -> String {
    format!("vk_{level}.vkey")
}

/// File name of the params blob for `degree` inside a params directory.
#[must_use]
pub fn params_file_name(degree: u32) -> String {
    format!("params{degree}")
}

/// Which side of the protocol a registry serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces proofs; needs every params degree.
    Prover,
    /// Checks proofs; needs the top degree and the verifying key.
    Verifier,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prover => "prover",
            Self::Verifier => "verifier",
        })
    }
}

/// Axes a level discriminates its artifact sets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    /// One artifact set for the level, fork-invariant.
    Unversioned,
    /// One artifact set per fork.
    ByFork,
    /// One artifact set per `(fork, circuit_version)`.
    ByForkAndVersion,
}

impl KeyScope {
    /// Scope implied by which optional axes are present.
    pub fn of(ctx: &VersionContext) -> std::result::Result<Self, ConfigurationError> {
        match (&ctx.fork_name, &ctx.circuit_version) {
            (None, None) => Ok(Self::Unversioned),
            (Some(_), None) => Ok(Self::ByFork),
            (Some(_), Some(_)) => Ok(Self::ByForkAndVersion),
            (None, Some(v)) => Err(ConfigurationError::InvalidConfig(format!(
                "circuit version {v:?} given without a fork name"
            ))),
        }
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unversioned => "unversioned",
            Self::ByFork => "by fork",
            Self::ByForkAndVersion => "by fork and circuit version",
        })
    }
}

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    /// Level the artifacts belong to.
    pub level: ProofLevel,
    /// Version context (absent axes are not discriminated).
    pub context: VersionContext,
}

impl ArtifactKey {
    /// Build a key.
    #[must_use]
    pub const fn new(level: ProofLevel, context: VersionContext) -> Self {
        Self { level, context }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.level, self.context)
    }
}

/// Whether a level can serve prove/verify calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    /// No artifact set loaded; every call is a configuration error.
    Uninitialized,
    /// At least one artifact set loaded.
    Ready,
}

/// Loaded parameters and verifying key material for one key.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    key: ArtifactKey,
    params: BTreeMap<u32, Vec<u8>>,
    vk: Vec<u8>,
    child_vk: Option<Vec<u8>>,
}

impl fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("key", &self.key)
            .field("degrees", &self.params.keys().collect::<Vec<_>>())
            .field("vk_len", &self.vk.len())
            .field("has_child_vk", &self.child_vk.is_some())
            .finish()
    }
}

impl ArtifactSet {
    /// Assemble an artifact set from in-memory parts (tests, fake registries).
    #[must_use]
    pub fn from_parts(
        key: ArtifactKey,
        params: BTreeMap<u32, Vec<u8>>,
        vk: Vec<u8>,
        child_vk: Option<Vec<u8>>,
    ) -> Self {
        Self {
            key,
            params,
            vk,
            child_vk,
        }
    }

    /// Load from disk for `role`.
    ///
    /// Provers read every required degree and, for aggregating levels, the
    /// child level's verifying key. Verifiers read the top degree only.
    pub fn load(
        key: ArtifactKey,
        role: Role,
        params_dir: &Path,
        assets_dir: &Path,
    ) -> std::result::Result<Self, ConfigurationError> {
        let degrees = required_degrees(key.level);
        let wanted: &[u32] = match role {
            Role::Prover => degrees,
            Role::Verifier => degrees.last().map_or(&[][..], std::slice::from_ref),
        };

        let mut params = BTreeMap::new();
        for &d in wanted {
            let p = params_dir.join(params_file_name(d));
            params.insert(d, read_nonempty(&p, &format!("params degree {d}"))?);
        }

        let vk = read_nonempty(
            &assets_dir.join(vk_file_name(key.level)),
            &format!("{} verifying key", key.level),
        )?;

        let child_vk = match (role, key.level.child()) {
            (Role::Prover, Some(child)) => Some(read_nonempty(
                &assets_dir.join(vk_file_name(child)),
                &format!("{child} verifying key"),
            )?),
            _ => None,
        };

        debug!(%key, %role, degrees = ?wanted, "loaded artifact set");
        Ok(Self {
            key,
            params,
            vk,
            child_vk,
        })
    }

    /// Registry key of this set.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> &ArtifactKey {
        &self.key
    }

    /// Level shortcut.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> ProofLevel {
        self.key.level
    }

    /// Version context shortcut.
    #[inline]
    #[must_use]
    pub const fn context(&self) -> &VersionContext {
        &self.key.context
    }

    /// Verifying key of this level.
    #[inline]
    #[must_use]
    pub fn vk(&self) -> &[u8] {
        &self.vk
    }

    /// Verifying key of the aggregated (child) level, if loaded.
    #[inline]
    #[must_use]
    pub fn child_vk(&self) -> Option<&[u8]> {
        self.child_vk.as_deref()
    }

    /// Verifying key for `level` as seen from this set (own or child).
    #[must_use]
    pub fn vk_for(&self, level: ProofLevel) -> Option<&[u8]> {
        if level == self.key.level {
            Some(&self.vk)
        } else if Some(level) == self.key.level.child() {
            self.child_vk()
        } else {
            None
        }
    }

    /// Params blob for `degree`.
    #[must_use]
    pub fn params(&self, degree: u32) -> Option<&[u8]> {
        self.params.get(&degree).map(Vec::as_slice)
    }

    /// Loaded degrees, ascending.
    pub fn degrees(&self) -> impl Iterator<Item = u32> + '_ {
        self.params.keys().copied()
    }
}

fn read_nonempty(path: &Path, what: &str) -> std::result::Result<Vec<u8>, ConfigurationError> {
    let bytes = std::fs::read(path).map_err(|e| ConfigurationError::AssetLoad {
        path: path.to_path_buf(),
        what: what.to_owned(),
        reason: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(ConfigurationError::AssetLoad {
            path: path.to_path_buf(),
            what: what.to_owned(),
            reason: "file is empty".into(),
        });
    }
    Ok(bytes)
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<ArtifactKey, Arc<ArtifactSet>>,
    scopes: BTreeMap<ProofLevel, KeyScope>,
}

/// Insert-only store of artifact sets for one role.
///
/// Initialization must happen before the registry is shared for concurrent
/// prove/verify calls; after that, lookups only take a read lock and hand
/// out `Arc` snapshots.
pub struct ArtifactRegistry {
    role: Role,
    inner: RwLock<Inner>,
}

impl fmt::Debug for ArtifactRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRegistry")
            .field("role", &self.role)
            .field("keys", &self.keys())
            .finish()
    }
}

impl ArtifactRegistry {
    /// Empty registry for `role`.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Role this registry serves.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    // Entries are insert-only and every insert is a single map operation, so
    // a poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load `level` artifacts for `context` from disk and register them.
    pub fn initialize(
        &self,
        level: ProofLevel,
        context: VersionContext,
        params_dir: &Path,
        assets_dir: &Path,
    ) -> Result<Arc<ArtifactSet>> {
        let key = ArtifactKey::new(level, context);
        self.check_insertable(&key)?;
        let set = ArtifactSet::load(key, self.role, params_dir, assets_dir)?;
        let set = self.insert(set)?;
        info!(
            key = %set.key(),
            role = %self.role,
            params_dir = %params_dir.display(),
            assets_dir = %assets_dir.display(),
            "artifact set initialized"
        );
        Ok(set)
    }

    /// Register an already-built artifact set.
    pub fn insert(&self, set: ArtifactSet) -> Result<Arc<ArtifactSet>> {
        let scope = KeyScope::of(set.context())?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Self::check_against(&inner, &set.key, scope)?;
        let level = set.level();
        let set = Arc::new(set);
        inner.scopes.entry(level).or_insert(scope);
        inner.entries.insert(set.key.clone(), Arc::clone(&set));
        Ok(set)
    }

    fn check_insertable(&self, key: &ArtifactKey) -> Result<()> {
        let scope = KeyScope::of(&key.context)?;
        Self::check_against(&self.read(), key, scope)
    }

    fn check_against(inner: &Inner, key: &ArtifactKey, scope: KeyScope) -> Result<()> {
        if let Some(&existing) = inner.scopes.get(&key.level) {
            if existing != scope {
                return Err(ConfigurationError::ScopeConflict {
                    level: key.level,
                    existing,
                    requested: scope,
                }
                .into());
            }
        }
        if inner.entries.contains_key(key) {
            return Err(ConfigurationError::AlreadyInitialized { key: key.clone() }.into());
        }
        Ok(())
    }

    /// Current state of `level`.
    #[must_use]
    pub fn state(&self, level: ProofLevel) -> LevelState {
        if self.read().scopes.contains_key(&level) {
            LevelState::Ready
        } else {
            LevelState::Uninitialized
        }
    }

    /// Fail with a configuration error unless `level` is ready.
    pub fn ensure_ready(&self, level: ProofLevel) -> Result<()> {
        match self.state(level) {
            LevelState::Ready => Ok(()),
            LevelState::Uninitialized => Err(ConfigurationError::Uninitialized {
                level,
                role: self.role,
            }
            .into()),
        }
    }

    /// Resolve the artifact set for `level` under the requested fork/version.
    ///
    /// Axes the level does not discriminate on are ignored; axes it does
    /// discriminate on must be present and match exactly.
    pub fn resolve(
        &self,
        level: ProofLevel,
        fork_name: Option<&str>,
        circuit_version: Option<&str>,
    ) -> Result<Arc<ArtifactSet>> {
        let inner = self.read();
        let scope = *inner
            .scopes
            .get(&level)
            .ok_or(ConfigurationError::Uninitialized {
                level,
                role: self.role,
            })?;

        let requested = VersionContext {
            fork_name: fork_name.map(str::to_owned),
            circuit_version: circuit_version.map(str::to_owned),
        };
        let unknown = || Error::UnknownArtifact {
            level,
            role: self.role,
            context: requested.clone(),
        };

        let projected = match scope {
            KeyScope::Unversioned => VersionContext::default(),
            KeyScope::ByFork => VersionContext {
                fork_name: Some(fork_name.ok_or_else(unknown)?.to_owned()),
                circuit_version: None,
            },
            KeyScope::ByForkAndVersion => VersionContext {
                fork_name: Some(fork_name.ok_or_else(unknown)?.to_owned()),
                circuit_version: Some(circuit_version.ok_or_else(unknown)?.to_owned()),
            },
        };

        inner
            .entries
            .get(&ArtifactKey::new(level, projected))
            .cloned()
            .ok_or_else(unknown)
    }

    /// All loaded keys, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.read().entries.keys().cloned().collect()
    }

    /// All artifact sets loaded for `level`.
    #[must_use]
    pub fn loaded(&self, level: ProofLevel) -> Vec<Arc<ArtifactSet>> {
        self.read()
            .entries
            .iter()
            .filter(|(k, _)| k.level == level)
            .map(|(_, v)| Arc::clone(v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn set(level: ProofLevel, ctx: VersionContext, vk: u8) -> ArtifactSet {
        ArtifactSet::from_parts(
            ArtifactKey::new(level, ctx),
            BTreeMap::from([(21, vec![1u8; 4])]),
            vec![vk; 32],
            None,
        )
    }

    #[test]
    fn uninitialized_level_is_configuration_error() {
        let reg = ArtifactRegistry::new(Role::Verifier);
        assert_eq!(reg.state(ProofLevel::Chunk), LevelState::Uninitialized);
        let err = reg
            .resolve(ProofLevel::Chunk, Some("bernoulli"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(reg.ensure_ready(ProofLevel::Chunk).is_err());
    }

    #[test]
    fn resolves_exact_fork_and_fails_closed_otherwise() {
        let reg = ArtifactRegistry::new(Role::Verifier);
        reg.insert(set(ProofLevel::Batch, VersionContext::fork("bernoulli"), 1))
            .unwrap();
        reg.insert(set(ProofLevel::Batch, VersionContext::fork("curie"), 2))
            .unwrap();
        assert_eq!(reg.state(ProofLevel::Batch), LevelState::Ready);

        let b = reg.resolve(ProofLevel::Batch, Some("bernoulli"), None).unwrap();
        assert_eq!(b.vk(), &[1u8; 32][..]);
        let c = reg.resolve(ProofLevel::Batch, Some("curie"), None).unwrap();
        assert_eq!(c.vk(), &[2u8; 32][..]);

        let err = reg.resolve(ProofLevel::Batch, Some("darwin"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArtifact);

        // A fork-keyed level needs a fork; no default entry exists.
        let err = reg.resolve(ProofLevel::Batch, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArtifact);
    }

    #[test]
    fn unversioned_level_ignores_requested_axes() {
        let reg = ArtifactRegistry::new(Role::Verifier);
        reg.insert(set(ProofLevel::Bundle, VersionContext::default(), 3))
            .unwrap();
        let a = reg.resolve(ProofLevel::Bundle, None, None).unwrap();
        let b = reg
            .resolve(ProofLevel::Bundle, Some("anything"), Some("v9"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn versioned_level_requires_both_axes() {
        let reg = ArtifactRegistry::new(Role::Verifier);
        reg.insert(set(
            ProofLevel::Chunk,
            VersionContext::versioned("darwin", "v0.12"),
            4,
        ))
        .unwrap();
        assert!(reg
            .resolve(ProofLevel::Chunk, Some("darwin"), Some("v0.12"))
            .is_ok());
        let err = reg
            .resolve(ProofLevel::Chunk, Some("darwin"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArtifact);
        let err = reg
            .resolve(ProofLevel::Chunk, Some("darwin"), Some("v0.13"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArtifact);
    }

    #[test]
    fn duplicate_and_mixed_scope_inserts_are_rejected() {
        let reg = ArtifactRegistry::new(Role::Prover);
        reg.insert(set(ProofLevel::Chunk, VersionContext::fork("bernoulli"), 1))
            .unwrap();

        let err = reg
            .insert(set(ProofLevel::Chunk, VersionContext::fork("bernoulli"), 9))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::AlreadyInitialized { .. })
        ));
        // The original entry is untouched.
        let kept = reg.resolve(ProofLevel::Chunk, Some("bernoulli"), None).unwrap();
        assert_eq!(kept.vk(), &[1u8; 32][..]);

        let err = reg
            .insert(set(ProofLevel::Chunk, VersionContext::default(), 2))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::ScopeConflict { .. })
        ));
    }

    #[test]
    fn version_without_fork_is_invalid() {
        let ctx = VersionContext {
            fork_name: None,
            circuit_version: Some("v1".into()),
        };
        assert!(KeyScope::of(&ctx).is_err());
    }

    #[test]
    fn vk_for_resolves_own_and_child() {
        let s = ArtifactSet::from_parts(
            ArtifactKey::new(ProofLevel::Batch, VersionContext::fork("f")),
            BTreeMap::new(),
            vec![1; 32],
            Some(vec![2; 32]),
        );
        assert_eq!(s.vk_for(ProofLevel::Batch), Some(&[1u8; 32][..]));
        assert_eq!(s.vk_for(ProofLevel::Chunk), Some(&[2u8; 32][..]));
        assert_eq!(s.vk_for(ProofLevel::Bundle), None);
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactSet::load(
            ArtifactKey::new(ProofLevel::Chunk, VersionContext::fork("f")),
            Role::Prover,
            dir.path(),
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::AssetLoad { .. }));
        assert!(err.to_string().contains("params20"));
    }

    #[test]
    fn verifier_loads_top_degree_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("params26"), b"p26").unwrap();
        std::fs::write(dir.path().join("vk_batch.vkey"), [7u8; 32]).unwrap();
        let s = ArtifactSet::load(
            ArtifactKey::new(ProofLevel::Batch, VersionContext::fork("f")),
            Role::Verifier,
            dir.path(),
            dir.path(),
        )
        .unwrap();
        assert_eq!(s.degrees().collect::<Vec<_>>(), vec![26]);
        assert!(s.child_vk().is_none());
    }
}
