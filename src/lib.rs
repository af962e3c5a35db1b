//! # vault-sync
//!
//! Fills empty application settings from a Vault secret at process startup.
//!
//! Provides the env-file scanner, the secret key to configuration path
//! mapping, the reconciliation engine with its two sync policies, a blocking
//! Vault client, and a fail-open bootstrap entry point.

pub mod boot;
pub mod config;
pub mod engine;
pub mod env;
pub mod envfile;
pub mod error;
pub mod mapping;
pub mod model;
pub mod store;
pub mod telemetry;
pub mod vault;
