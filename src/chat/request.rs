//! Request types
//!
//! The client-facing chat completion request and the body sent to upstream
//! OpenAI-compatible endpoints.

use serde::{Deserialize, Serialize};

use super::types::Message;
use crate::config::UpstreamConfig;

fn default_stream() -> bool {
    true
}

/// Chat completion request accepted from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Body of an outbound chat completion call
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
}

impl<'a> UpstreamRequest<'a> {
    /// Request using the tier's configured model and sampling settings
    pub fn new(upstream: &'a UpstreamConfig, messages: &'a [Message], stream: bool) -> Self {
        Self {
            model: &upstream.model,
            messages,
            stream,
            max_tokens: upstream.max_tokens,
            temperature: upstream.temperature,
            tools: None,
        }
    }

    /// Override sampling settings with the client's values, when given
    pub fn with_overrides(mut self, max_tokens: Option<u32>, temperature: Option<f64>) -> Self {
        if let Some(max_tokens) = max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = temperature {
            self.temperature = temperature;
        }
        self
    }

    /// Expose tools (functions) to the model
    pub fn with_tools(mut self, tools: serde_json::Value) -> Self {
        self.tools = Some(tools);
        self
    }
}
