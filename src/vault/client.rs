//! Blocking Vault HTTP client.
//!
//! Performs a single authenticated GET per read and caches responses for the
//! configured TTL. Timeouts are owned by the underlying HTTP client; there is
//! no retry.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::cache::ResponseCache;
use super::{SecretBundle, SecretStore, parse_response};
use crate::config::VaultConfig;
use crate::error::{Error, Result};

const TOKEN_HEADER: &str = "X-Vault-Token";

pub struct VaultClient {
    http: reqwest::blocking::Client,
    base_url: String,
    engine: String,
    token: Option<SecretString>,
    cache: ResponseCache,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url)
            .field("engine", &self.engine)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl VaultClient {
    /// Build a client from configuration: normalized address, resolved token,
    /// timeout and cache TTL.
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        let base_url = config
            .base_url()
            .ok_or_else(|| Error::Config("vault address is empty".to_string()))?;
        Self::new(
            base_url,
            &config.engine,
            config.resolve_token()?,
            config.timeout,
            config.cache_ttl,
        )
    }

    /// Build a client against an already-normalized base URL.
    pub fn new(
        base_url: impl Into<String>,
        engine: &str,
        token: Option<SecretString>,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            engine: engine.trim_matches('/').to_string(),
            token,
            cache: ResponseCache::new(cache_ttl),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API path for a secret path. Paths already under the engine mount are
    /// used as given; bare names go under the KV v2 data endpoint.
    pub fn api_path(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if self.engine.is_empty() || path.starts_with(&format!("{}/", self.engine)) {
            path.to_string()
        } else {
            format!("{}/data/{path}", self.engine)
        }
    }

    /// Full request URL for a secret path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, self.api_path(path))
    }

    /// Drop all cached responses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn fetch_uncached(&self, url: &str) -> Result<Option<SecretBundle>> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.expose_secret());
        }

        let response = request.send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::SecretStoreUnreachable(format!(
                "{url} returned {status}"
            )));
        }

        let body: Value = response.json()?;
        Ok(parse_response(&body))
    }
}

impl SecretStore for VaultClient {
    fn read(&self, path: &str) -> Result<Option<SecretBundle>> {
        let url = self.url(path);

        if let Some(cached) = self.cache.get(&url) {
            tracing::debug!(%url, "secret read served from cache");
            return Ok(cached);
        }

        tracing::debug!(%url, "reading secret");
        let bundle = self.fetch_uncached(&url)?;
        self.cache.insert(&url, bundle.clone());
        Ok(bundle)
    }
}
