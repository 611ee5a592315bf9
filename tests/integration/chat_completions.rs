//! Chat completions endpoint integration tests
//!
//! Covers authentication, request validation, the streaming response shape
//! and non-streaming aggregation.

use axum::http::{header, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{
    bearer, chat_request, constants, message_texts, sse_content, sse_json, sse_payloads,
    TestHarness,
};
use crate::mocks::{FALLBACK_MODEL, PRIMARY_MODEL, RELAY_PROMPT};

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_is_unauthorized() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .json(&chat_request(json!("hi"), true))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(header::AUTHORIZATION, bearer("not-the-key"))
        .json(&chat_request(json!("hi"), true))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dGVzdDp0ZXN0"),
        )
        .json(&chat_request(json!("hi"), true))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_unsupported_model_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .chat(&json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MODEL");
    // Nothing reached the upstream
    assert!(harness.upstream.stream_requests(PRIMARY_MODEL).await.is_empty());
}

#[tokio::test]
async fn test_empty_messages_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .chat(&json!({"model": constants::HYBRID_MODEL, "messages": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness
        .chat(&json!({"model": constants::HYBRID_MODEL, "messages": "not a list"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_stream_is_normalized_and_terminated() {
    let harness = TestHarness::new().await;
    harness
        .upstream
        .mock_stream(PRIMARY_MODEL, &["Hello", ", world"])
        .await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        HeaderValue::from_static("text/event-stream")
    );

    let body = response.text();
    assert_eq!(sse_content(&body), vec!["Hello", ", world"]);
    assert_eq!(sse_payloads(&body).last().map(String::as_str), Some("[DONE]"));

    let chunks = sse_json(&body);
    assert!(chunks.iter().all(|c| c["model"] == constants::HYBRID_MODEL));
    assert!(chunks.iter().all(|c| c["object"] == "chat.completion.chunk"));
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_stream_defaults_to_true() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream(PRIMARY_MODEL, &["ok"]).await;

    let response = harness
        .chat(&json!({
            "model": constants::HYBRID_MODEL,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(sse_content(&response.text()), vec!["ok"]);
}

#[tokio::test]
async fn test_composed_request_ends_with_relay_prompt() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream(PRIMARY_MODEL, &["ok"]).await;

    harness
        .chat(&json!({
            "model": constants::HYBRID_MODEL,
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "reply"},
                {"role": "user", "content": "second"}
            ]
        }))
        .await
        .assert_status_ok();

    let requests = harness.upstream.stream_requests(PRIMARY_MODEL).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        message_texts(&requests[0]),
        vec!["first", "reply", "second", RELAY_PROMPT]
    );
    assert_eq!(requests[0]["messages"][3]["role"], "system");
}

#[tokio::test]
async fn test_client_sampling_overrides_tier_defaults() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream(PRIMARY_MODEL, &["ok"]).await;

    harness
        .chat(&json!({
            "model": constants::HYBRID_MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 42,
            "temperature": 0.1
        }))
        .await
        .assert_status_ok();

    let requests = harness.upstream.stream_requests(PRIMARY_MODEL).await;
    assert_eq!(requests[0]["max_tokens"], 42);
    assert_eq!(requests[0]["temperature"], 0.1);
    assert_eq!(requests[0]["model"], PRIMARY_MODEL);
}

#[tokio::test]
async fn test_upstream_uses_tier_credentials_not_client_token() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream(PRIMARY_MODEL, &["ok"]).await;

    harness
        .chat(&chat_request(json!("hi"), true))
        .await
        .assert_status_ok();

    let received = harness
        .upstream
        .server()
        .received_requests()
        .await
        .unwrap_or_default();
    assert!(!received.is_empty());
    for request in received {
        let auth = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(!auth.contains(constants::TEST_API_KEY));
    }
}

// =============================================================================
// Non-streaming
// =============================================================================

#[tokio::test]
async fn test_non_streaming_aggregates_chunks() {
    let harness = TestHarness::new().await;
    harness
        .upstream
        .mock_stream(PRIMARY_MODEL, &["Hel", "lo"])
        .await;

    let response = harness.chat(&chat_request(json!("hi"), false)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], constants::HYBRID_MODEL);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_non_streaming_both_failed_is_bad_gateway() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream_status(PRIMARY_MODEL, 500).await;
    harness.upstream.mock_stream_status(FALLBACK_MODEL, 503).await;

    let response = harness.chat(&chat_request(json!("hi"), false)).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}

// =============================================================================
// Models
// =============================================================================

#[tokio::test]
async fn test_models_lists_hybrid_model() {
    let harness = TestHarness::new().await;

    let response = harness.get("/v1/models").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["id"], constants::HYBRID_MODEL);
}
