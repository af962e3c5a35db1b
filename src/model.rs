//! Core data model.
//!
//! A reconciliation run takes a secret bundle, decides per key whether it may
//! fill an empty setting, and reports what it did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Sync policy
// ---------------------------------------------------------------------------

/// Which keys are eligible to be filled from the secret store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    /// Only keys declared empty in the env file, and still empty live.
    #[default]
    EnvFirst,
    /// Any bundle key whose live environment value is unset or empty.
    /// For deployments without an env file.
    StoreFirst,
}

impl std::fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncPolicy::EnvFirst => "env-first",
            SyncPolicy::StoreFirst => "store-first",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SyncPolicy {
    type Err = Error;

    /// Accepts the `sync_mode` spellings `env` and `vault` as well as the
    /// policy names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" | "env-first" => Ok(SyncPolicy::EnvFirst),
            "vault" | "store" | "store-first" => Ok(SyncPolicy::StoreFirst),
            other => Err(Error::Config(format!("unknown sync mode: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Secret path
// ---------------------------------------------------------------------------

/// Where to read the secret from, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPathConfig {
    /// Configured base path (e.g. `secret/data`). May be empty.
    pub base_path: String,
    /// Secret name (e.g. `myapp`). May be empty.
    pub secret_name: String,
}

impl SecretPathConfig {
    pub fn new(base_path: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            secret_name: secret_name.into(),
        }
    }

    pub fn resolve(&self) -> String {
        resolve_secret_path(&self.base_path, &self.secret_name)
    }
}

/// Combine a base path and secret name into the path to read.
///
/// - empty base: the bare secret name
/// - base ending in `/data/<name>`: the base, verbatim
/// - base ending in `/data`, or anything else: base (without trailing `/`)
///   joined to the secret name
///
/// An empty secret name leaves the base as is. The result is trimmed; an
/// empty result means there is nothing to read.
pub fn resolve_secret_path(base_path: &str, secret_name: &str) -> String {
    let base = base_path.trim();
    let name = secret_name.trim();

    let path = if base.is_empty() {
        name.to_string()
    } else if ends_with_data_segment(base) {
        base.to_string()
    } else if name.is_empty() {
        base.trim_end_matches('/').to_string()
    } else {
        format!("{}/{name}", base.trim_end_matches('/'))
    };

    path.trim().to_string()
}

/// `…/data/<segment>` with a non-empty final segment.
fn ends_with_data_segment(path: &str) -> bool {
    match path.rsplit_once('/') {
        Some((head, last)) => !last.is_empty() && head.ends_with("/data"),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    /// A non-empty value already exists; never overwritten.
    SkippedAlreadySet,
    /// Declared empty in the env file but the secret has no such key.
    SkippedNotInBundle,
    /// In the secret but the env file never declares it.
    SkippedNotDeclared,
    /// The environment cannot hold this key name or its value.
    SkippedRejected,
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::SkippedAlreadySet => "skipped_already_set",
            ApplyOutcome::SkippedNotInBundle => "skipped_not_in_bundle",
            ApplyOutcome::SkippedNotDeclared => "skipped_not_declared",
            ApplyOutcome::SkippedRejected => "skipped_rejected",
        };
        write!(f, "{s}")
    }
}

/// Per-key result. Never carries the secret value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutcome {
    /// Uppercased key.
    pub key: String,
    pub outcome: ApplyOutcome,
    /// Configuration path written, if the key was mapped and applied there.
    pub config_path: Option<String>,
}

impl KeyOutcome {
    pub fn skipped(key: impl Into<String>, outcome: ApplyOutcome) -> Self {
        Self {
            key: key.into(),
            outcome,
            config_path: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Full pass over the candidates. The boot guard is now set.
    Completed,
    /// The boot guard was already set; nothing was read.
    AlreadyApplied,
    /// Base path and secret name resolved to nothing.
    EmptyPath,
    /// The store holds no secret at the resolved path.
    SecretNotFound,
    /// Env-first run with no empty keys declared in the env file.
    NoEmptyKeys,
}

impl RunStatus {
    /// Whether the run was a no-op that leaves the guard unset.
    pub fn is_noop(self) -> bool {
        !matches!(self, RunStatus::Completed)
    }
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub status: RunStatus,
    pub policy: SyncPolicy,
    /// Resolved secret path. Empty if resolution produced nothing.
    pub secret_path: String,
    pub outcomes: Vec<KeyOutcome>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub(crate) fn new(status: RunStatus, policy: SyncPolicy, secret_path: String) -> Self {
        Self {
            status,
            policy,
            secret_path,
            outcomes: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Number of keys applied.
    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }

    /// Outcomes for applied keys.
    pub fn applied(&self) -> impl Iterator<Item = &KeyOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == ApplyOutcome::Applied)
    }

    /// Outcome for `key`, if the run considered it.
    pub fn outcome(&self, key: &str) -> Option<&KeyOutcome> {
        let key = key.to_uppercase();
        self.outcomes.iter().find(|o| o.key == key)
    }
}

// ---------------------------------------------------------------------------
// Boot guard
// ---------------------------------------------------------------------------

/// One-shot flag: once a run completes, later runs against the same guard
/// are no-ops. Never reset.
#[derive(Debug, Default)]
pub struct BootGuard {
    applied: bool,
}

impl BootGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub(crate) fn mark_applied(&mut self) {
        self.applied = true;
    }
}
