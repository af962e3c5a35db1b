//! Startup integration.
//!
//! [`Bootstrap`] owns the boot guard and is what a host calls during
//! startup. It never fails: every error from the engine or the secret store
//! is logged as a warning and startup continues with whatever configuration
//! already exists.

use std::path::PathBuf;

use crate::config::VaultConfig;
use crate::engine::Engine;
use crate::env::EnvironmentWriter;
use crate::model::{BootGuard, ReconcileReport};
use crate::store::ConfigStore;
use crate::vault::{SecretStore, VaultClient};

/// Maintenance commands that must not trigger a secret fetch.
pub const SKIP_COMMANDS: &[&str] = &[
    "config:cache",
    "config:clear",
    "cache:clear",
    "route:cache",
    "route:clear",
    "view:cache",
    "view:clear",
];

/// Whether `command` is a maintenance command on the skip-list.
pub fn is_maintenance_command(command: &str) -> bool {
    let command = command.trim();
    SKIP_COMMANDS.iter().any(|c| *c == command)
}

/// Whether a command line (`argv[0]` is the program) names a maintenance
/// command as its first argument.
pub fn should_skip<S: AsRef<str>>(argv: &[S]) -> bool {
    argv.get(1)
        .is_some_and(|cmd| is_maintenance_command(cmd.as_ref()))
}

/// One-per-process entry point into the engine.
pub struct Bootstrap {
    engine: Engine,
    guard: BootGuard,
}

impl Bootstrap {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            guard: BootGuard::new(),
        }
    }

    /// Bootstrap with an engine built from `config`, consulting `env_file`
    /// under the env-first policy.
    pub fn from_config(config: &VaultConfig, env_file: Option<PathBuf>) -> Self {
        let engine = Engine::from_config(config);
        let engine = match env_file {
            Some(path) => engine.env_file(path),
            None => engine,
        };
        Self::new(engine)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn guard(&self) -> &BootGuard {
        &self.guard
    }

    /// Reconcile against `store`. Errors are logged and swallowed.
    pub fn boot(
        &mut self,
        store: &dyn SecretStore,
        config: &mut dyn ConfigStore,
        env: &mut dyn EnvironmentWriter,
    ) -> Option<ReconcileReport> {
        match self.engine.reconcile(&mut self.guard, store, config, env) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "vault bootstrap fetch failed");
                None
            }
        }
    }

    /// Like [`Bootstrap::boot`], but does nothing when `argv` names a
    /// maintenance command.
    pub fn boot_for_command<S: AsRef<str>>(
        &mut self,
        argv: &[S],
        store: &dyn SecretStore,
        config: &mut dyn ConfigStore,
        env: &mut dyn EnvironmentWriter,
    ) -> Option<ReconcileReport> {
        if should_skip(argv) {
            tracing::debug!(
                command = argv.get(1).map(|c| c.as_ref()).unwrap_or_default(),
                "maintenance command; skipping vault sync"
            );
            return None;
        }
        self.boot(store, config, env)
    }

    /// Build a [`VaultClient`] from `vault` and reconcile against it. A
    /// client that cannot be built is logged and treated as no secrets.
    pub fn boot_from_config(
        &mut self,
        vault: &VaultConfig,
        config: &mut dyn ConfigStore,
        env: &mut dyn EnvironmentWriter,
    ) -> Option<ReconcileReport> {
        if self.guard.is_applied() {
            return None;
        }
        let client = match VaultClient::from_config(vault) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "vault client unavailable");
                return None;
            }
        };
        self.boot(&client, config, env)
    }
}
