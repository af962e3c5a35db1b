//! Reconciliation span helpers.

use tracing::Span;

/// Start a span for one reconciliation run.
///
/// `reconcile.applied` is declared empty and filled by [`record_applied`].
pub fn start_reconcile_span(policy: &str, secret_path: &str) -> Span {
    tracing::info_span!(
        "reconcile.run",
        "reconcile.policy" = policy,
        "reconcile.secret_path" = secret_path,
        "reconcile.applied" = tracing::field::Empty,
    )
}

/// Record the number of applied keys on the span.
pub fn record_applied(span: &Span, applied: usize) {
    span.record("reconcile.applied", applied as u64);
}

/// Emit a per-key decision event scoped to the span. Never pass values.
pub fn record_outcome(span: &Span, key: &str, outcome: &str) {
    span.in_scope(|| {
        tracing::debug!(key = key, outcome = outcome, "key_outcome");
    });
}
