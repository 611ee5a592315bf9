//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "gateway_requests_total",
        "Total number of chat completion requests processed"
    );
    metrics::describe_counter!(
        "gateway_relay_outcomes_total",
        "Relayed streams by the upstream that finished them"
    );
    metrics::describe_counter!(
        "gateway_cache_operations_total",
        "Total URL content cache operations"
    );
    metrics::describe_counter!(
        "gateway_auxiliary_calls_total",
        "Enrichment calls (fetch, describe, decide, search) by result"
    );
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        "Request duration in seconds"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished request
pub fn record_request(status: &str, model: &str, duration_secs: f64) {
    metrics::counter!("gateway_requests_total", "status" => status.to_string(), "model" => model.to_string())
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

/// Record how a relayed stream ended: `primary`, `fallback` or `failed`
pub fn record_relay_outcome(outcome: &'static str) {
    metrics::counter!("gateway_relay_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record cache operation
pub fn record_cache_operation(operation: &'static str, result: &'static str) {
    metrics::counter!(
        "gateway_cache_operations_total",
        "operation" => operation,
        "result" => result
    )
    .increment(1);
}

/// Record an enrichment call and whether it contributed anything
pub fn record_auxiliary_call(kind: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!(
        "gateway_auxiliary_calls_total",
        "kind" => kind,
        "result" => result
    )
    .increment(1);
}
