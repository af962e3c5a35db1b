//! Typed configuration for the secret sync.
//!
//! Loaded from `VAULT_*` environment variables with defaults, optionally
//! overlaid by the `[vault]` table of a TOML file. The token is wrapped in
//! `secrecy::SecretString` to keep it out of logs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{SecretPathConfig, SyncPolicy};

pub const DEFAULT_ADDR: &str = "http://127.0.0.1";
pub const DEFAULT_PORT: u16 = 8200;
pub const DEFAULT_ENGINE: &str = "secret";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub addr: String,
    pub port: Option<u16>,
    pub token: Option<SecretString>,
    pub token_file: Option<PathBuf>,
    /// KV mount the secret lives under.
    pub engine: String,
    /// Base path; see [`crate::model::resolve_secret_path`].
    pub path: String,
    /// Secret name appended to `path`.
    pub secret: String,
    pub timeout: Duration,
    /// Zero disables response caching.
    pub cache_ttl: Duration,
    pub update_env: bool,
    pub update_config: bool,
    pub sync_mode: SyncPolicy,
    /// Caller overrides for the key mapping table.
    pub config_mappings: BTreeMap<String, String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            port: Some(DEFAULT_PORT),
            token: None,
            token_file: None,
            engine: DEFAULT_ENGINE.to_string(),
            path: String::new(),
            secret: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            update_env: true,
            update_config: true,
            sync_mode: SyncPolicy::default(),
            config_mappings: BTreeMap::new(),
        }
    }
}

/// The `[vault]` table of a TOML config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSection {
    addr: Option<String>,
    port: Option<u16>,
    token: Option<String>,
    token_file: Option<PathBuf>,
    engine: Option<String>,
    path: Option<String>,
    secret: Option<String>,
    timeout: Option<u64>,
    cache_ttl: Option<u64>,
    update_env: Option<bool>,
    update_config: Option<bool>,
    sync_mode: Option<String>,
    #[serde(default)]
    config_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    vault: FileSection,
}

impl VaultConfig {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv().ok()` first if the env file should count.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from environment variables, then overlay `file` if given.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("cannot read config file {}: {e}", path.display()))
            })?;
            config.merge_toml(&text)?;
        }
        Ok(config)
    }

    /// Build from an arbitrary variable lookup. Unset and empty variables
    /// leave the default in place, except `VAULT_ADDR`: set but empty means
    /// no secret store, so no client can be built.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = lookup("VAULT_ADDR") {
            config.addr = addr.trim().to_string();
        }
        if let Some(port) = var("VAULT_PORT") {
            config.port = Some(parse_port(&port)?);
        }
        config.token = var("VAULT_TOKEN").map(SecretString::from);
        config.token_file = var("VAULT_TOKEN_FILE").map(PathBuf::from);
        if let Some(engine) = var("VAULT_ENGINE") {
            config.engine = engine;
        }
        config.path = var("VAULT_PATH").unwrap_or_default();
        config.secret = var("VAULT_SECRET").unwrap_or_default();
        if let Some(flag) = var("VAULT_UPDATE_ENV") {
            config.update_env = parse_bool("VAULT_UPDATE_ENV", &flag)?;
        }
        if let Some(flag) = var("VAULT_UPDATE_CONFIG") {
            config.update_config = parse_bool("VAULT_UPDATE_CONFIG", &flag)?;
        }
        if let Some(mode) = var("VAULT_SYNC_MODE") {
            config.sync_mode = mode.parse()?;
        }

        Ok(config)
    }

    /// Overlay the `[vault]` table of a TOML document.
    pub fn merge_toml(&mut self, text: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| Error::Config(format!("bad config file: {e}")))?;
        let section = file.vault;

        if let Some(addr) = section.addr {
            self.addr = addr;
        }
        if section.port.is_some() {
            self.port = section.port;
        }
        if let Some(token) = section.token {
            self.token = Some(SecretString::from(token));
        }
        if section.token_file.is_some() {
            self.token_file = section.token_file;
        }
        if let Some(engine) = section.engine {
            self.engine = engine;
        }
        if let Some(path) = section.path {
            self.path = path;
        }
        if let Some(secret) = section.secret {
            self.secret = secret;
        }
        if let Some(secs) = section.timeout {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = section.cache_ttl {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(flag) = section.update_env {
            self.update_env = flag;
        }
        if let Some(flag) = section.update_config {
            self.update_config = flag;
        }
        if let Some(mode) = section.sync_mode {
            self.sync_mode = mode.parse()?;
        }
        self.config_mappings.extend(section.config_mappings);

        Ok(())
    }

    /// Base URL of the secret store: scheme defaulted to `http://`, and
    /// `port` appended when the address carries none. No trailing slash.
    pub fn base_url(&self) -> Option<String> {
        normalize_addr(&self.addr, self.port)
    }

    /// The token, from `token` or else the trimmed contents of `token_file`.
    pub fn resolve_token(&self) -> Result<Option<SecretString>> {
        if let Some(token) = &self.token
            && !token.expose_secret().is_empty()
        {
            return Ok(Some(token.clone()));
        }
        let Some(path) = &self.token_file else {
            return Ok(None);
        };
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read token file {}: {e}", path.display()))
        })?;
        let token = contents.trim();
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(token.to_string())))
    }

    /// Base path and secret name for path resolution.
    pub fn secret_path(&self) -> SecretPathConfig {
        SecretPathConfig {
            base_path: self.path.clone(),
            secret_name: self.secret.clone(),
        }
    }
}

/// Normalize a secret-store address. `None` for a blank address.
pub fn normalize_addr(addr: &str, port: Option<u16>) -> Option<String> {
    let addr = addr.trim();
    if addr.is_empty() {
        return None;
    }

    let lower = addr.to_ascii_lowercase();
    let mut url = if lower.starts_with("http://") || lower.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };

    if let Some(port) = port
        && !has_port(&url)
    {
        url = format!("{}:{port}", url.trim_end_matches('/'));
    }

    Some(url.trim_end_matches('/').to_string())
}

/// Whether the authority part of `url` already names a port.
fn has_port(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    // Bracketed IPv6 literals contain colons of their own.
    let host = host.rsplit_once(']').map_or(host, |(_, tail)| tail);
    match host.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("VAULT_PORT is not a valid port: {value}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{name} is not a boolean: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_port_ignores_scheme_and_path() {
        assert!(has_port("http://vault:8200"));
        assert!(has_port("http://vault:8200/"));
        assert!(!has_port("http://vault"));
        assert!(!has_port("http://vault/v1:x"));
        assert!(!has_port("http://[::1]"));
        assert!(has_port("http://[::1]:8200"));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
