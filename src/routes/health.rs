//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with cache statistics
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// URL content cache statistics
#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
}

/// Application statistics
#[derive(Debug, Serialize)]
pub struct HealthStats {
    pub uptime_seconds: u64,
    pub content_cache: CacheStats,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub stats: HealthStats,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Full health check endpoint
///
/// The gateway has no stateful dependencies, so it is healthy whenever it
/// can answer; tiers without an API key are reported as degraded.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let config = state.config_store.snapshot();
    let uptime = state.start_time.elapsed().as_secs();

    let status = if config.primary.api_key.is_some() && config.fallback.api_key.is_some() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        timestamp: chrono::Utc::now().to_rfc3339(),
        stats: HealthStats {
            uptime_seconds: uptime,
            content_cache: CacheStats {
                entries: state.content_cache.len(),
                capacity: state.content_cache.capacity(),
            },
        },
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe endpoint
///
/// Returns 200 OK once the application state is built.
pub async fn readiness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
///
/// Returns 200 OK if the application is alive.
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
