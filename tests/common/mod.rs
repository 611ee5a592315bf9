//! Common test utilities for the gateway
//!
//! This module provides the shared harness: mock upstreams, a configuration
//! pointing every tier at them, and helpers for reading SSE responses.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use hybrid_gateway::{
    config::{Prompts, UpstreamConfig},
    routes, AppState, Config,
};

use crate::mocks::{
    MockPages, MockUpstream, DECISION_PROMPT, FALLBACK_MODEL, IMAGE_CONTEXT_PROMPT,
    PRIMARY_MODEL, RELAY_PROMPT, SEARCH_CONTEXT_PROMPT, SEARCH_MODEL, TERMS_PROMPT, VISION_MODEL,
};

/// Test configuration constants
pub mod constants {
    /// Bearer secret accepted by the gateway under test
    pub const TEST_API_KEY: &str = "test-gateway-key";
    /// Public model label
    pub const HYBRID_MODEL: &str = "GeminiMIXR1";
}

/// Configuration pointing every tier at `upstream_url`
pub fn test_config(upstream_url: &str, upload_dir: &str) -> Config {
    let tier = |model: &str| UpstreamConfig {
        base_url: upstream_url.to_string(),
        api_key: Some(format!("{}-key", model)),
        model: model.to_string(),
        max_tokens: 512,
        temperature: 0.5,
        timeout: Duration::from_secs(2),
    };

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_key: constants::TEST_API_KEY.to_string(),
        hybrid_model_name: constants::HYBRID_MODEL.to_string(),
        request_timeout: Duration::from_secs(1),
        max_redirects: 5,
        content_cache_capacity: 32,
        content_cache_ttl: None,
        upload_dir: upload_dir.to_string(),
        search_enabled: true,
        vision_enabled: true,
        primary: tier(PRIMARY_MODEL),
        fallback: tier(FALLBACK_MODEL),
        vision: tier(VISION_MODEL),
        search: tier(SEARCH_MODEL),
        prompts: Prompts {
            relay: RELAY_PROMPT.to_string(),
            search_context: SEARCH_CONTEXT_PROMPT.to_string(),
            image_context: IMAGE_CONTEXT_PROMPT.to_string(),
            vision: "DESCRIBE-IMAGE".to_string(),
            search_decision: DECISION_PROMPT.to_string(),
            search_terms: TERMS_PROMPT.to_string(),
        },
    }
}

/// Full gateway wired to mock upstreams and mock web pages
pub struct TestHarness {
    pub server: TestServer,
    pub upstream: MockUpstream,
    pub pages: MockPages,
    pub state: Arc<AppState>,
    pub upload_dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build a harness after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let upstream = MockUpstream::start().await;
        let pages = MockPages::start().await;
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let mut config = test_config(
            &upstream.uri(),
            &upload_dir.path().to_string_lossy(),
        );
        adjust(&mut config);

        let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
        let app = routes::create_router(state.clone());
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            upstream,
            pages,
            state,
            upload_dir,
        }
    }

    /// Authenticated POST to the chat endpoint
    pub fn chat(&self, body: &Value) -> TestRequest {
        self.server
            .post("/v1/chat/completions")
            .add_header(header::AUTHORIZATION, bearer(constants::TEST_API_KEY))
            .json(body)
    }

    /// Authenticated request helpers
    pub fn get(&self, path: &str) -> TestRequest {
        self.server
            .get(path)
            .add_header(header::AUTHORIZATION, bearer(constants::TEST_API_KEY))
    }

    pub fn post(&self, path: &str) -> TestRequest {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, bearer(constants::TEST_API_KEY))
    }

    pub fn delete(&self, path: &str) -> TestRequest {
        self.server
            .delete(path)
            .add_header(header::AUTHORIZATION, bearer(constants::TEST_API_KEY))
    }
}

pub fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {}", token)
        .parse()
        .expect("valid header value")
}

/// Chat request body with a single user message
pub fn chat_request(content: Value, stream: bool) -> Value {
    json!({
        "model": constants::HYBRID_MODEL,
        "messages": [{"role": "user", "content": content}],
        "stream": stream
    })
}

/// Payloads of every `data:` line in an SSE body, in order
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

/// Parsed JSON payloads, skipping the `[DONE]` marker
pub fn sse_json(body: &str) -> Vec<Value> {
    sse_payloads(body)
        .iter()
        .filter(|p| p.as_str() != "[DONE]")
        .map(|p| serde_json::from_str(p).expect("SSE payload should be JSON"))
        .collect()
}

/// Concatenated delta content of a relayed SSE body
pub fn sse_content(body: &str) -> Vec<String> {
    sse_json(body)
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text of every message in an upstream request body
pub fn message_texts(body: &Value) -> Vec<String> {
    body["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .map(|m| match &m["content"] {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
