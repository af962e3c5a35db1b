//! Environment file scanner.
//!
//! Reads a line-oriented `KEY=VALUE` file and reports which keys the
//! application declares and which of those are left empty. The file is
//! only ever read.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{Error, Result};

/// State of a single key as seen in the environment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKeyState {
    /// Declared with a non-empty value.
    PresentWithValue,
    /// Declared, but the value is empty after trimming and unquoting.
    PresentEmpty,
    /// Never declared in the file.
    Absent,
}

/// Result of scanning an environment file. Keys are uppercased.
#[derive(Debug, Clone, Default)]
pub struct EnvFileScan {
    entries: BTreeMap<String, EnvKeyState>,
}

impl EnvFileScan {
    /// Parse file contents. Later declarations of the same key win.
    pub fn parse(content: &str) -> Self {
        let mut entries = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            let key = key.trim();
            let key = key.strip_prefix("export ").map(str::trim).unwrap_or(key);
            if key.is_empty() {
                continue;
            }

            let state = if unquote(value.trim()).is_empty() {
                EnvKeyState::PresentEmpty
            } else {
                EnvKeyState::PresentWithValue
            };
            entries.insert(key.to_uppercase(), state);
        }

        Self { entries }
    }

    /// State of `key` (case-insensitive).
    pub fn state(&self, key: &str) -> EnvKeyState {
        self.entries
            .get(&key.to_uppercase())
            .copied()
            .unwrap_or(EnvKeyState::Absent)
    }

    /// Every key the file declares, empty or not.
    pub fn declared_keys(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Declared keys whose value is empty.
    pub fn empty_keys(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(_, state)| **state == EnvKeyState::PresentEmpty)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate `(key, state)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EnvKeyState)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), *s))
    }
}

/// Scan an environment file.
///
/// A missing or unreadable file yields an empty scan; the failure is logged
/// and never propagated.
pub fn scan(path: &Path) -> EnvFileScan {
    match read_env_file(path) {
        Ok(Some(content)) => EnvFileScan::parse(&content),
        Ok(None) => {
            tracing::debug!(path = %path.display(), "env file not found");
            EnvFileScan::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring env file");
            EnvFileScan::default()
        }
    }
}

fn read_env_file(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::EnvFileUnreadable(path.to_path_buf(), e.to_string())),
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_strips_only_matching_pairs() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc'"), "\"abc'");
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("\"\"x\"\""), "\"x\"");
    }

    #[test]
    fn splits_on_first_equals_only() {
        let scan = EnvFileScan::parse("URL=postgres://u:p@h/db?a=b\n");
        assert_eq!(scan.state("URL"), EnvKeyState::PresentWithValue);
    }
}
