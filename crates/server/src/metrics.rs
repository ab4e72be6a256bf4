// crates/server/src/metrics.rs
//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions (counters)
//! - Helper functions for recording metrics
//!
//! The `/metrics` endpoint handler lives in `routes::metrics`.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded. Returns `true`
/// if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "downloads_dispatched_total",
        "Download tasks accepted, labeled by requested kind"
    );
    describe_counter!(
        "info_probes_total",
        "Metadata probes served, labeled ok or degraded"
    );
    describe_counter!(
        "files_served_total",
        "Finished artifacts streamed to clients, labeled by content type"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record an accepted download dispatch. `kind` is the raw route segment,
/// so unsupported kinds show up under their own label.
pub fn record_dispatch(kind: &str) {
    counter!("downloads_dispatched_total", "kind" => kind.to_string()).increment(1);
}

/// Record a metadata probe, `outcome` is "ok" or "degraded".
pub fn record_probe(outcome: &'static str) {
    counter!("info_probes_total", "outcome" => outcome).increment(1);
}

/// Record one artifact download served to a client.
pub fn record_file_served(content_type: &str) {
    counter!("files_served_total", "content_type" => content_type.to_string()).increment(1);
}
