//! Error types for vault-sync.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("secret store unreachable: {0}")]
    SecretStoreUnreachable(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("env file {path} unreadable: {1}", path = .0.display())]
    EnvFileUnreadable(PathBuf, String),

    #[error("environment write rejected: {0}")]
    Environment(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::SecretStoreUnreachable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
