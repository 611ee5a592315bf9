//! Fallback integration tests
//!
//! The primary stream failing at any point hands over to the fallback
//! model; both failing ends the stream with a single error event.

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{chat_request, constants, sse_content, sse_json, sse_payloads, TestHarness};
use crate::mocks::{chunk_line, FALLBACK_MODEL, PRIMARY_MODEL};

#[tokio::test]
async fn test_primary_breaking_mid_stream_switches_to_fallback() {
    let harness = TestHarness::new().await;
    let broken = format!(
        "{}{}data: {{bad\n\n",
        chunk_line("chatcmpl-primary", "one "),
        chunk_line("chatcmpl-primary", "two ")
    );
    harness.upstream.mock_stream_raw(PRIMARY_MODEL, broken).await;
    harness
        .upstream
        .mock_stream(FALLBACK_MODEL, &["complete ", "answer"])
        .await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    response.assert_status_ok();
    let body = response.text();
    assert_eq!(
        sse_content(&body),
        vec!["one ", "two ", "complete ", "answer"]
    );
    assert_eq!(sse_payloads(&body).last().map(String::as_str), Some("[DONE]"));
    assert!(sse_json(&body)
        .iter()
        .all(|chunk| chunk["model"] == constants::HYBRID_MODEL));

    // Fallback received the same composed messages as the primary
    let primary = harness.upstream.stream_requests(PRIMARY_MODEL).await;
    let fallback = harness.upstream.stream_requests(FALLBACK_MODEL).await;
    assert_eq!(primary[0]["messages"], fallback[0]["messages"]);
}

#[tokio::test]
async fn test_primary_error_status_uses_fallback() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream_status(PRIMARY_MODEL, 429).await;
    harness.upstream.mock_stream(FALLBACK_MODEL, &["from fallback"]).await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    response.assert_status_ok();
    assert_eq!(sse_content(&response.text()), vec!["from fallback"]);
}

#[tokio::test]
async fn test_slow_primary_uses_fallback() {
    let harness = TestHarness::with_config(|config| {
        config.primary.timeout = Duration::from_millis(300);
    })
    .await;
    harness
        .upstream
        .mock_slow_stream(PRIMARY_MODEL, Duration::from_secs(3))
        .await;
    harness.upstream.mock_stream(FALLBACK_MODEL, &["on time"]).await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    assert_eq!(sse_content(&response.text()), vec!["on time"]);
}

#[tokio::test]
async fn test_both_failing_emits_one_error_event() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_stream_status(PRIMARY_MODEL, 500).await;
    harness.upstream.mock_stream_status(FALLBACK_MODEL, 500).await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    // The stream had already started, so the status stays 200
    response.assert_status(StatusCode::OK);
    let body = response.text();
    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 1);

    let event: serde_json::Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(event["error"]["message"], "All models failed");
    assert_eq!(event["error"]["type"], "stream_error");
    assert!(!body.contains("[DONE]"));
}

#[tokio::test]
async fn test_partial_primary_then_failing_fallback_ends_with_error() {
    let harness = TestHarness::new().await;
    let broken = format!("{}data: not-json\n\n", chunk_line("chatcmpl-primary", "partial"));
    harness.upstream.mock_stream_raw(PRIMARY_MODEL, broken).await;
    harness.upstream.mock_stream_status(FALLBACK_MODEL, 502).await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    let body = response.text();
    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 2);
    assert_eq!(sse_content(&body), vec!["partial"]);
    assert!(payloads[1].contains("All models failed"));
}

#[tokio::test]
async fn test_non_streaming_returns_only_fallback_answer() {
    let harness = TestHarness::new().await;
    let broken = format!("{}data: {{bad\n\n", chunk_line("chatcmpl-primary", "The answer is fort"));
    harness.upstream.mock_stream_raw(PRIMARY_MODEL, broken).await;
    harness
        .upstream
        .mock_stream(FALLBACK_MODEL, &["The answer is 42."])
        .await;

    let response = harness.chat(&chat_request(json!("hi"), false)).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["choices"][0]["message"]["content"], "The answer is 42.");
}

#[tokio::test]
async fn test_ok_status_with_json_error_body_uses_fallback() {
    let harness = TestHarness::new().await;
    harness
        .upstream
        .mock_stream_raw(
            PRIMARY_MODEL,
            "{\"error\":{\"message\":\"quota exceeded\"}}\n".to_string(),
        )
        .await;
    harness.upstream.mock_stream(FALLBACK_MODEL, &["fallback text"]).await;

    let response = harness.chat(&chat_request(json!("hi"), true)).await;

    let body = response.text();
    assert_eq!(sse_content(&body), vec!["fallback text"]);
    assert_eq!(sse_payloads(&body).last().map(String::as_str), Some("[DONE]"));
}
