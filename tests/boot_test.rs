//! Integration tests for the startup entry point.

mod common;

use common::{CountingStore, UnreachableStore, bundle};
use serde_json::json;
use vault_sync::boot::{Bootstrap, is_maintenance_command, should_skip};
use vault_sync::config::VaultConfig;
use vault_sync::engine::{Engine, ReconcileOptions};
use vault_sync::env::{EnvironmentWriter, MemoryEnv};
use vault_sync::mapping::MappingTable;
use vault_sync::model::{RunStatus, SecretPathConfig, SyncPolicy};
use vault_sync::store::ConfigTree;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_first_bootstrap() -> Bootstrap {
    Bootstrap::new(Engine::new(
        ReconcileOptions {
            secret_path: SecretPathConfig::new("secret/data", "app"),
            policy: SyncPolicy::StoreFirst,
            ..ReconcileOptions::default()
        },
        MappingTable::default(),
    ))
}

#[test]
fn maintenance_commands_are_recognized() {
    for cmd in [
        "config:cache",
        "config:clear",
        "cache:clear",
        "route:cache",
        "route:clear",
        "view:cache",
        "view:clear",
    ] {
        assert!(is_maintenance_command(cmd), "{cmd}");
    }
    assert!(!is_maintenance_command("serve"));
    assert!(!is_maintenance_command("migrate"));
}

#[test]
fn skip_checks_the_first_argument_only() {
    assert!(should_skip(&["artisan", "config:cache"]));
    assert!(!should_skip(&["artisan", "serve", "config:cache"]));
    assert!(!should_skip(&["artisan"]));
    assert!(!should_skip::<&str>(&[]));
}

#[test]
fn maintenance_command_skips_the_fetch() {
    let store = CountingStore::new("secret/data/app", bundle([("A", json!("x"))]));
    let mut bootstrap = store_first_bootstrap();
    let mut env = MemoryEnv::new();

    let report = bootstrap.boot_for_command(
        &["artisan", "route:cache"],
        &store,
        &mut ConfigTree::new(),
        &mut env,
    );

    assert!(report.is_none());
    assert_eq!(store.reads.get(), 0);
    assert!(!bootstrap.guard().is_applied());
}

#[test]
fn ordinary_command_reconciles() {
    let store = CountingStore::new("secret/data/app", bundle([("A", json!("x"))]));
    let mut bootstrap = store_first_bootstrap();
    let mut env = MemoryEnv::new();

    let report = bootstrap
        .boot_for_command(&["artisan", "serve"], &store, &mut ConfigTree::new(), &mut env)
        .unwrap();

    assert_eq!(report.applied_count(), 1);
    assert_eq!(env.get("A").as_deref(), Some("x"));
}

#[test]
fn store_failure_does_not_escape() {
    let mut bootstrap = store_first_bootstrap();
    let mut env = MemoryEnv::with_vars([("APP_NAME", "demo")]);

    let report = bootstrap.boot(&UnreachableStore, &mut ConfigTree::new(), &mut env);

    assert!(report.is_none());
    assert!(!bootstrap.guard().is_applied());
    assert_eq!(env, MemoryEnv::with_vars([("APP_NAME", "demo")]));
}

#[test]
fn repeated_boot_applies_once() {
    let store = CountingStore::new("secret/data/app", bundle([("A", json!("x"))]));
    let mut bootstrap = store_first_bootstrap();
    let mut env = MemoryEnv::new();
    let mut config = ConfigTree::new();

    let first = bootstrap.boot(&store, &mut config, &mut env).unwrap();
    let second = bootstrap.boot(&store, &mut config, &mut env).unwrap();

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(second.status, RunStatus::AlreadyApplied);
    assert_eq!(store.reads.get(), 1);
}

#[test]
fn unbuildable_client_is_logged_not_raised() {
    let vault = VaultConfig {
        addr: "  ".to_string(),
        secret: "app".to_string(),
        ..VaultConfig::default()
    };
    let mut bootstrap = Bootstrap::from_config(&vault, None);

    let report = bootstrap.boot_from_config(&vault, &mut ConfigTree::new(), &mut MemoryEnv::new());
    assert!(report.is_none());
}

#[tokio::test]
async fn vault_outage_degrades_to_existing_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let vault = VaultConfig {
        addr: server.uri(),
        port: None,
        path: "secret/data".to_string(),
        secret: "app".to_string(),
        sync_mode: SyncPolicy::StoreFirst,
        ..VaultConfig::default()
    };

    let (report, env) = tokio::task::spawn_blocking(move || {
        let mut bootstrap = Bootstrap::from_config(&vault, None);
        let mut env = MemoryEnv::with_vars([("DB_HOST", "db")]);
        let report = bootstrap.boot_from_config(&vault, &mut ConfigTree::new(), &mut env);
        (report, env)
    })
    .await
    .unwrap();

    assert!(report.is_none());
    assert_eq!(env, MemoryEnv::with_vars([("DB_HOST", "db")]));
}
