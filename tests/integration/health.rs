//! Health endpoint integration tests
//!
//! Tests for the public endpoints:
//! - GET /health - Full health check with cache statistics
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe
//! - GET /metrics - Prometheus scrape endpoint

use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestHarness;

#[tokio::test]
async fn test_health_is_public_and_reports_cache() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["stats"]["content_cache"]["entries"], 0);
    assert_eq!(body["stats"]["content_cache"]["capacity"], 32);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_degraded_without_primary_key() {
    let harness = TestHarness::with_config(|config| config.primary.api_key = None).await;

    let body: Value = harness.server.get("/health").await.json();

    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_probes_are_public() {
    let harness = TestHarness::new().await;

    for path in ["/health/live", "/health/ready"] {
        let response = harness.server.get(path).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy", "probe {}", path);
    }
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    hybrid_gateway::routes::metrics::init_metrics();
    let harness = TestHarness::new().await;

    harness.server.get("/metrics").await.assert_status_ok();
}

#[tokio::test]
async fn test_rejected_model_names_do_not_become_metric_labels() {
    hybrid_gateway::routes::metrics::init_metrics();
    let harness = TestHarness::new().await;

    harness
        .chat(&serde_json::json!({
            "model": "client-chosen-model-7f3a",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);

    let metrics = harness.server.get("/metrics").await.text();
    assert!(metrics.contains(r#"model="unsupported""#));
    assert!(!metrics.contains("client-chosen-model-7f3a"));
}
