//! Reconciliation engine.
//!
//! Reads one secret bundle and fills empty settings from it. A value that is
//! already set is never overwritten. All I/O is synchronous and each run
//! performs at most one secret read.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde_json::Value;

use crate::config::VaultConfig;
use crate::env::{self, EnvironmentWriter};
use crate::envfile::{self, EnvFileScan, EnvKeyState};
use crate::error::{Error, Result};
use crate::mapping::MappingTable;
use crate::model::*;
use crate::store::ConfigStore;
use crate::telemetry;
use crate::vault::{self, SecretBundle, SecretStore};

/// Per-run switches.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub secret_path: SecretPathConfig,
    pub policy: SyncPolicy,
    /// Write applied values to the environment.
    pub update_env: bool,
    /// Write applied values to mapped configuration paths.
    pub update_config: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            secret_path: SecretPathConfig::default(),
            policy: SyncPolicy::default(),
            update_env: true,
            update_config: true,
        }
    }
}

impl ReconcileOptions {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            secret_path: config.secret_path(),
            policy: config.sync_mode,
            update_env: config.update_env,
            update_config: config.update_config,
        }
    }
}

/// The reconciliation engine. Holds the mapping table and options; the
/// collaborators it reads and writes are passed per run.
pub struct Engine {
    options: ReconcileOptions,
    mappings: MappingTable,
    env_file: Option<PathBuf>,
}

impl Engine {
    pub fn new(options: ReconcileOptions, mappings: MappingTable) -> Self {
        Self {
            options,
            mappings,
            env_file: None,
        }
    }

    /// Engine with options and mapping overrides taken from `config`.
    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(
            ReconcileOptions::from_config(config),
            MappingTable::new(&config.config_mappings),
        )
    }

    /// Env file consulted by the env-first policy.
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    /// Run one reconciliation pass.
    ///
    /// No-op outcomes (guard already set, empty path, no secret, no empty
    /// keys) return `Ok` with the matching [`RunStatus`]. Only a completed
    /// pass sets `guard`. An error from the store or from an environment
    /// write aborts the run; keys applied before the error stay applied.
    pub fn reconcile(
        &self,
        guard: &mut BootGuard,
        store: &dyn SecretStore,
        config: &mut dyn ConfigStore,
        env: &mut dyn EnvironmentWriter,
    ) -> Result<ReconcileReport> {
        let policy = self.options.policy;

        if guard.is_applied() {
            tracing::debug!("secrets already applied in this process; skipping");
            return Ok(ReconcileReport::new(
                RunStatus::AlreadyApplied,
                policy,
                String::new(),
            ));
        }

        let started = Instant::now();
        let secret_path = self.options.secret_path.resolve();
        let span = telemetry::reconcile::start_reconcile_span(&policy.to_string(), &secret_path);
        let _entered = span.enter();

        let mut report = ReconcileReport::new(RunStatus::Completed, policy, secret_path.clone());

        if secret_path.is_empty() {
            tracing::debug!("secret path is empty; skipping secret fetch");
            report.status = RunStatus::EmptyPath;
            return Ok(finish(report, started));
        }

        let bundle = match vault::fetch(store, &secret_path) {
            Ok(bundle) => vault::normalize_keys(bundle),
            Err(Error::SecretNotFound(_)) => {
                tracing::debug!(path = %secret_path, "no secret found");
                report.status = RunStatus::SecretNotFound;
                return Ok(finish(report, started));
            }
            Err(e) => {
                telemetry::metrics::fetch_errors().add(1, &[]);
                return Err(e);
            }
        };

        let plan = match policy {
            SyncPolicy::StoreFirst => plan_store_first(&bundle, env),
            SyncPolicy::EnvFirst => {
                let scan = self
                    .env_file
                    .as_deref()
                    .map(envfile::scan)
                    .unwrap_or_default();
                if scan.empty_keys().is_empty() {
                    tracing::debug!("no empty keys declared in env file");
                    report.status = RunStatus::NoEmptyKeys;
                    return Ok(finish(report, started));
                }
                plan_env_first(&bundle, &scan, env)
            }
        };

        for skipped in plan.skipped {
            telemetry::reconcile::record_outcome(&span, &skipped.key, &skipped.outcome.to_string());
            telemetry::metrics::secrets_skipped().add(
                1,
                &[
                    KeyValue::new("policy", policy.to_string()),
                    KeyValue::new("reason", skipped.outcome.to_string()),
                ],
            );
            report.outcomes.push(skipped);
        }

        for key in plan.candidates {
            let Some(value) = bundle.get(&key) else {
                continue;
            };
            let config_path = self.apply(&key, value, config, env)?;
            telemetry::reconcile::record_outcome(&span, &key, "applied");
            report.outcomes.push(KeyOutcome {
                key,
                outcome: ApplyOutcome::Applied,
                config_path,
            });
        }

        let applied = report.applied_count();
        telemetry::reconcile::record_applied(&span, applied);
        telemetry::metrics::secrets_applied()
            .add(applied as u64, &[KeyValue::new("policy", policy.to_string())]);
        tracing::info!(applied, %policy, path = %secret_path, "applied secrets from vault");

        guard.mark_applied();
        Ok(finish(report, started))
    }

    /// Write one approved key. Returns the configuration path written, if any.
    fn apply(
        &self,
        key: &str,
        value: &Value,
        config: &mut dyn ConfigStore,
        env: &mut dyn EnvironmentWriter,
    ) -> Result<Option<String>> {
        let mut written = None;

        if self.options.update_config
            && let Some(path) = self.mappings.resolve(key)
        {
            config.set(&path, value.clone());
            written = Some(path);
        }

        if self.options.update_env {
            env.set(key, &vault::env_value(value))?;
        }

        Ok(written)
    }
}

fn finish(mut report: ReconcileReport, started: Instant) -> ReconcileReport {
    let elapsed = started.elapsed();
    report.duration_ms = elapsed.as_millis() as u64;
    telemetry::metrics::reconcile_duration_ms().record(
        elapsed.as_secs_f64() * 1000.0,
        &[KeyValue::new("status", format!("{:?}", report.status))],
    );
    report
}

// ---------------------------------------------------------------------------
// Candidate selection
// ---------------------------------------------------------------------------

/// Keys to apply and keys ruled out, both in key order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub candidates: Vec<String>,
    pub skipped: Vec<KeyOutcome>,
}

/// Whether the environment can hold `key` with `value`. Logs the key, never
/// the value, when it cannot.
fn accepted(key: &str, value: &Value) -> bool {
    match env::validate(key, &vault::env_value(value)) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(key = ?key, error = %e, "skipped; environment cannot hold this key");
            false
        }
    }
}

/// Store-first: every bundle key whose live value is unset or empty.
///
/// `bundle` keys must already be uppercased.
pub fn plan_store_first(bundle: &SecretBundle, env: &dyn EnvironmentWriter) -> Plan {
    let mut plan = Plan::default();
    for (key, value) in bundle {
        if !accepted(key, value) {
            plan.skipped
                .push(KeyOutcome::skipped(key, ApplyOutcome::SkippedRejected));
        } else if env.is_empty(key) {
            plan.candidates.push(key.clone());
        } else {
            tracing::debug!(key = %key, "skipped; already set in environment");
            plan.skipped
                .push(KeyOutcome::skipped(key, ApplyOutcome::SkippedAlreadySet));
        }
    }
    plan
}

/// Env-first: bundle keys declared empty in the env file and still empty
/// live.
///
/// `bundle` keys must already be uppercased.
pub fn plan_env_first(
    bundle: &SecretBundle,
    scan: &EnvFileScan,
    env: &dyn EnvironmentWriter,
) -> Plan {
    let mut plan = Plan::default();
    let empty: BTreeSet<String> = scan.empty_keys();

    for key in &empty {
        let Some(value) = bundle.get(key) else {
            tracing::debug!(key = %key, "empty in env file but not found in vault");
            plan.skipped
                .push(KeyOutcome::skipped(key, ApplyOutcome::SkippedNotInBundle));
            continue;
        };
        if !accepted(key, value) {
            plan.skipped
                .push(KeyOutcome::skipped(key, ApplyOutcome::SkippedRejected));
        } else if !env.is_empty(key) {
            tracing::debug!(key = %key, "skipped; already set in environment");
            plan.skipped
                .push(KeyOutcome::skipped(key, ApplyOutcome::SkippedAlreadySet));
        } else {
            plan.candidates.push(key.clone());
        }
    }

    for key in bundle.keys().filter(|k| !empty.contains(*k)) {
        let outcome = match scan.state(key) {
            EnvKeyState::PresentWithValue => ApplyOutcome::SkippedAlreadySet,
            _ => ApplyOutcome::SkippedNotDeclared,
        };
        plan.skipped.push(KeyOutcome::skipped(key, outcome));
    }

    plan.skipped.sort_by(|a, b| a.key.cmp(&b.key));
    plan
}
