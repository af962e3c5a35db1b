//! Integration tests for the key mapping table.

use vault_sync::mapping::{Category, DEFAULT_MAPPINGS, MappingSource, MappingTable};

#[test]
fn builtin_categories_resolve() {
    let table = MappingTable::default();
    assert_eq!(
        table.resolve("DB_PASSWORD").as_deref(),
        Some("database.connections.mysql.password")
    );
    assert_eq!(
        table.resolve("REDIS_HOST").as_deref(),
        Some("database.redis.default.host")
    );
    assert_eq!(table.resolve("QUEUE_CONNECTION").as_deref(), Some("queue.default"));
    assert_eq!(table.resolve("MAIL_FROM_NAME").as_deref(), Some("mail.from.name"));
    assert_eq!(table.resolve("SESSION_DRIVER").as_deref(), Some("session.driver"));
    assert_eq!(
        table.resolve("AWS_BUCKET").as_deref(),
        Some("filesystems.disks.s3.bucket")
    );
    assert_eq!(
        table.source("AWS_BUCKET"),
        Some(MappingSource::Default(Category::CloudStorage))
    );
}

#[test]
fn db_user_and_db_username_share_a_target() {
    let table = MappingTable::default();
    assert_eq!(table.resolve("DB_USER"), table.resolve("DB_USERNAME"));
}

#[test]
fn custom_mapping_overrides_default() {
    let table = MappingTable::new([("DB_PASSWORD", "secrets.db")]);
    assert_eq!(table.resolve("DB_PASSWORD").as_deref(), Some("secrets.db"));
    assert_eq!(table.source("DB_PASSWORD"), Some(MappingSource::Custom));
    assert_eq!(table.len(), DEFAULT_MAPPINGS.len());
}

#[test]
fn custom_keys_are_case_insensitive() {
    let table = MappingTable::new([("my_api_key", "services.myapi.key")]);
    assert_eq!(
        table.resolve("MY_API_KEY").as_deref(),
        Some("services.myapi.key")
    );
    assert_eq!(
        table.resolve("my_api_key").as_deref(),
        Some("services.myapi.key")
    );
}

#[test]
fn reserved_prefix_falls_back_to_vault_namespace() {
    let table = MappingTable::default();
    assert_eq!(table.resolve("VAULT_FOO_BAR").as_deref(), Some("vault.foo_bar"));
    assert_eq!(table.source("VAULT_FOO_BAR"), None);
}

#[test]
fn explicit_entry_beats_reserved_prefix() {
    let table = MappingTable::new([("VAULT_TEST", "services.test.token")]);
    assert_eq!(
        table.resolve("VAULT_TEST").as_deref(),
        Some("services.test.token")
    );
}

#[test]
fn unknown_key_maps_to_nothing() {
    assert_eq!(MappingTable::default().resolve("STRIPE_SECRET"), None);
}

#[test]
fn resolution_is_deterministic() {
    let a = MappingTable::new([("X", "a.b")]);
    let b = MappingTable::new([("X", "a.b")]);
    let left: Vec<_> = a.entries().collect();
    let right: Vec<_> = b.entries().collect();
    assert_eq!(left, right);
}
