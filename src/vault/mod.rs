//! Secret store access.
//!
//! The engine only needs a single read of a path returning a flat bundle.
//! [`VaultClient`] implements that against the Vault HTTP API.

pub mod cache;
pub mod client;

pub use client::VaultClient;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Flat key/value map from a single secret read.
pub type SecretBundle = BTreeMap<String, Value>;

/// Anything that can read a secret bundle by path.
pub trait SecretStore {
    /// Read the bundle at `path`. `Ok(None)` means the path holds no secret.
    fn read(&self, path: &str) -> Result<Option<SecretBundle>>;
}

/// Read `path`, turning an absent secret into [`Error::SecretNotFound`].
pub fn fetch(store: &dyn SecretStore, path: &str) -> Result<SecretBundle> {
    store
        .read(path)?
        .ok_or_else(|| Error::SecretNotFound(path.to_string()))
}

/// Uppercase every key. On a case collision the key that sorts last wins.
pub fn normalize_keys(bundle: SecretBundle) -> SecretBundle {
    bundle
        .into_iter()
        .map(|(k, v)| (k.to_uppercase(), v))
        .collect()
}

/// Render a bundle value for the environment: strings verbatim, everything
/// else as JSON text.
pub fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract the bundle from a Vault read response body.
///
/// KV v2 nests the secret under `data.data`; KV v1 returns it under `data`.
/// Anything else holds no bundle.
pub fn parse_response(body: &Value) -> Option<SecretBundle> {
    let data = body.get("data")?.as_object()?;
    let secret = match data.get("data") {
        Some(Value::Object(inner)) if data.contains_key("metadata") => inner,
        _ => data,
    };
    Some(secret.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticStore {
    secrets: BTreeMap<String, SecretBundle>,
}

impl StaticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle at `path`.
    pub fn with_secret(mut self, path: impl Into<String>, bundle: SecretBundle) -> Self {
        self.secrets.insert(path.into(), bundle);
        self
    }
}

impl SecretStore for StaticStore {
    fn read(&self, path: &str) -> Result<Option<SecretBundle>> {
        Ok(self.secrets.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kv2_data_key_without_metadata_is_a_plain_secret() {
        // A KV v1 secret that happens to contain a "data" field.
        let body = json!({"data": {"data": {"x": 1}, "other": "y"}});
        let bundle = parse_response(&body).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle["other"], json!("y"));
    }

    #[test]
    fn env_value_renders_non_strings_as_json() {
        assert_eq!(env_value(&json!("s")), "s");
        assert_eq!(env_value(&json!(5432)), "5432");
        assert_eq!(env_value(&json!(true)), "true");
        assert_eq!(env_value(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
