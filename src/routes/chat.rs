//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions API endpoint. Every request is
//! enriched, composed and relayed; `stream: false` aggregates the relayed
//! chunks into a single response.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument};

use crate::{
    chat::ChatCompletionRequest,
    config::Config,
    error::AppError,
    relay::{collect_completion, into_sse, Sampling},
    routes::metrics::record_request,
    AppState,
};

/// Reject requests the gateway cannot serve before any upstream work starts
fn validate(config: &Config, request: &ChatCompletionRequest) -> Result<(), AppError> {
    if request.model != config.hybrid_model_name {
        return Err(AppError::UnsupportedModel(request.model.clone()));
    }
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }
    Ok(())
}

/// Metrics label for a request's model; client-chosen names never become labels
fn model_label<'a>(config: &'a Config, requested: &str) -> &'a str {
    if requested == config.hybrid_model_name {
        &config.hybrid_model_name
    } else {
        "unsupported"
    }
}

/// Handle chat completion requests
#[instrument(skip_all)]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();
    // One snapshot serves the whole request, even if credentials change meanwhile
    let config = state.config_store.snapshot();

    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let chat_request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    if let Err(e) = validate(&config, &chat_request) {
        record_request(
            "rejected",
            model_label(&config, &chat_request.model),
            start_time.elapsed().as_secs_f64(),
        );
        return Err(e);
    }

    info!(
        model = %chat_request.model,
        stream = chat_request.stream,
        messages = chat_request.messages.len(),
        "Processing chat completion request"
    );

    let sampling = Sampling {
        max_tokens: chat_request.max_tokens,
        temperature: chat_request.temperature,
    };
    let composed = state.enricher.enrich(&config, &chat_request.messages).await;
    let events = state.relay.relay(config.clone(), composed, sampling);
    let model = config.hybrid_model_name.clone();

    if !chat_request.stream {
        let result = collect_completion(events, &model).await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_request(status, &model, start_time.elapsed().as_secs_f64());
        return Ok((StatusCode::OK, Json(result?)).into_response());
    }

    // Headers are committed here; later failures only show up in the stream
    record_request("streaming", &model, start_time.elapsed().as_secs_f64());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(into_sse(events)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
