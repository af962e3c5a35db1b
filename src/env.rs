//! Environment access.
//!
//! The engine reads and writes environment variables through
//! [`EnvironmentWriter`] so that tests and dry runs can use an in-memory map
//! instead of the live process environment.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Read/write access to environment variables.
pub trait EnvironmentWriter {
    /// Current value of `key`, or `None` if unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Set `key` to `value`. Visible to subsequent `get` calls.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// True when `key` is unset or set to the empty string.
    fn is_empty(&self, key: &str) -> bool {
        self.get(key).is_none_or(|v| v.is_empty())
    }
}

/// The live process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentWriter for ProcessEnv {
    /// Non-unicode values are converted lossily rather than hidden.
    fn get(&self, key: &str) -> Option<String> {
        if !is_valid_name(key) {
            return None;
        }
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        // SAFETY: reconciliation runs once during startup, before the host
        // spawns threads that read the environment.
        unsafe {
            std::env::set_var(key, value);
        }
        Ok(())
    }

    fn is_empty(&self, key: &str) -> bool {
        !is_valid_name(key) || std::env::var_os(key).is_none_or(|v| v.is_empty())
    }
}

/// In-memory environment. Starts empty unless seeded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `(key, value)` pairs.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl EnvironmentWriter for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        self.vars.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Whether `key` can name an environment variable at all.
pub fn is_valid_name(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}

/// Reject what `std::env::set_var` would panic on.
pub fn validate(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Environment("empty variable name".to_string()));
    }
    if key.contains('=') || key.contains('\0') {
        return Err(Error::Environment(format!(
            "invalid variable name {key:?}"
        )));
    }
    if value.contains('\0') {
        return Err(Error::Environment(format!(
            "value for {key} contains a NUL byte"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_env_rejects_invalid_names() {
        let mut env = MemoryEnv::new();
        assert!(env.set("", "x").is_err());
        assert!(env.set("A=B", "x").is_err());
        assert!(env.set("A", "x\0y").is_err());
        assert!(env.vars().is_empty());
    }

    #[test]
    fn empty_string_counts_as_empty() {
        let env = MemoryEnv::with_vars([("A", ""), ("B", "set")]);
        assert!(env.is_empty("A"));
        assert!(!env.is_empty("B"));
        assert!(env.is_empty("C"));
    }

    // The process environment is shared by every test in this binary, so
    // each test below uses its own variable names.

    #[test]
    fn process_env_set_is_visible_to_get() {
        let mut env = ProcessEnv::new();
        assert!(env.is_empty("VAULT_SYNC_ENV_TEST_SET"));

        env.set("VAULT_SYNC_ENV_TEST_SET", "value").unwrap();

        assert_eq!(env.get("VAULT_SYNC_ENV_TEST_SET").as_deref(), Some("value"));
        assert!(!env.is_empty("VAULT_SYNC_ENV_TEST_SET"));
    }

    #[test]
    fn process_env_rejects_invalid_names_without_panicking() {
        let mut env = ProcessEnv::new();
        assert!(matches!(env.set("", "x"), Err(Error::Environment(_))));
        assert!(matches!(env.set("A=B", "x"), Err(Error::Environment(_))));
        assert!(matches!(env.set("A\0B", "x"), Err(Error::Environment(_))));
        assert!(matches!(
            env.set("VAULT_SYNC_ENV_TEST_NUL", "x\0y"),
            Err(Error::Environment(_))
        ));
        assert!(env.get("VAULT_SYNC_ENV_TEST_NUL").is_none());
        assert!(env.get("A=B").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn process_env_non_unicode_value_is_not_empty() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var(
                "VAULT_SYNC_ENV_TEST_NON_UTF8",
                OsStr::from_bytes(b"op\xffval"),
            );
        }
        let env = ProcessEnv::new();

        assert!(!env.is_empty("VAULT_SYNC_ENV_TEST_NON_UTF8"));
        assert_eq!(
            env.get("VAULT_SYNC_ENV_TEST_NON_UTF8").as_deref(),
            Some("op\u{FFFD}val")
        );
    }
}
