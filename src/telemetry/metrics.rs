//! Metric instrument factories for vault-sync.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for vault-sync instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("vault-sync")
}

/// Counter: secret keys written to the environment and/or configuration.
/// Labels: `policy`.
pub fn secrets_applied() -> Counter<u64> {
    meter()
        .u64_counter("vault_sync.secrets.applied")
        .with_description("Number of secret keys applied")
        .build()
}

/// Counter: secret keys considered but not applied.
/// Labels: `policy`, `reason`.
pub fn secrets_skipped() -> Counter<u64> {
    meter()
        .u64_counter("vault_sync.secrets.skipped")
        .with_description("Number of secret keys skipped")
        .build()
}

/// Counter: failed secret store reads.
pub fn fetch_errors() -> Counter<u64> {
    meter()
        .u64_counter("vault_sync.fetch.errors")
        .with_description("Number of failed secret store reads")
        .build()
}

/// Histogram: reconciliation run duration in milliseconds.
/// Labels: `status`.
pub fn reconcile_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("vault_sync.reconcile.duration_ms")
        .with_description("Reconciliation run duration in milliseconds")
        .with_unit("ms")
        .build()
}
