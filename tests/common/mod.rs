//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::io::Write;

use serde_json::Value;
use vault_sync::error::{Error, Result};
use vault_sync::vault::{SecretBundle, SecretStore};

/// Build a bundle from `(key, value)` pairs.
pub fn bundle<const N: usize>(pairs: [(&str, Value); N]) -> SecretBundle {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Write `content` to a fresh env file.
pub fn env_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp env file");
    file.write_all(content.as_bytes()).expect("write env file");
    file
}

/// Store that serves one bundle at one path and counts reads.
pub struct CountingStore {
    path: String,
    bundle: SecretBundle,
    pub reads: Cell<usize>,
}

impl CountingStore {
    pub fn new(path: &str, bundle: SecretBundle) -> Self {
        Self {
            path: path.to_string(),
            bundle,
            reads: Cell::new(0),
        }
    }
}

impl SecretStore for CountingStore {
    fn read(&self, path: &str) -> Result<Option<SecretBundle>> {
        self.reads.set(self.reads.get() + 1);
        if path == self.path {
            Ok(Some(self.bundle.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Store whose every read fails as if the server were down.
pub struct UnreachableStore;

impl SecretStore for UnreachableStore {
    fn read(&self, _path: &str) -> Result<Option<SecretBundle>> {
        Err(Error::SecretStoreUnreachable(
            "connection refused".to_string(),
        ))
    }
}
