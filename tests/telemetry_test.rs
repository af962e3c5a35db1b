//! Integration tests for telemetry initialization and span helpers.

use std::io::Write;
use std::sync::{Arc, Mutex};

use vault_sync::telemetry::{self, TelemetryConfig};

/// Shared buffer a scoped fmt subscriber writes into.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn reconcile_span_carries_run_fields_into_key_events() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let span = telemetry::reconcile::start_reconcile_span("env-first", "secret/data/app");
        telemetry::reconcile::record_applied(&span, 1);
        telemetry::reconcile::record_outcome(&span, "DB_PASSWORD", "applied");
    });

    let out = capture.text();
    assert!(out.contains("reconcile.run"), "{out}");
    assert!(out.contains("secret/data/app"), "{out}");
    assert!(out.contains("reconcile.applied=1"), "{out}");
    assert!(out.contains("key_outcome"), "{out}");
    assert!(out.contains("DB_PASSWORD"), "{out}");
}

#[test]
fn smoke_init_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init in the same binary returns Err, which is acceptable here.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "vault-sync-test".to_string(),
        default_filter: "debug".to_string(),
    };
    if let Ok(guard) = telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());

        // Instruments fall back to the no-op global meter without a provider.
        telemetry::metrics::secrets_applied().add(1, &[]);
        telemetry::metrics::secrets_skipped().add(1, &[]);
        telemetry::metrics::fetch_errors().add(1, &[]);
        telemetry::metrics::reconcile_duration_ms().record(1.5, &[]);

        guard.force_flush();
    }
}
