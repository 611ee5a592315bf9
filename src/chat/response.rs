//! Response types
//!
//! Normalized chunk shape emitted to clients, the aggregated non-streaming
//! response, and the lenient shapes parsed from upstreams.

use serde::{Deserialize, Serialize};

use super::types::Role;

/// Delta content in a normalized chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Delta {
    /// Content fragment; empty when the upstream sent none
    pub content: String,
    /// Reasoning fragment from thinking models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// A choice in a normalized chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Normalized streaming chunk sent to clients
///
/// `model` always carries the gateway's public hybrid label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Content fragment of the first choice
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.delta.content.as_str())
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

/// Message in an aggregated completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

/// Chat completion response (non-streaming)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
}

// ============================================================================
// Upstream shapes
// ============================================================================

/// Delta as sent by an upstream
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpstreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// Streaming choice as sent by an upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChoice {
    #[serde(default)]
    pub delta: UpstreamDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Streaming chunk as sent by an upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
    pub choices: Vec<UpstreamChoice>,
}

/// Message of a non-streaming upstream completion
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Choice of a non-streaming upstream completion
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

/// Non-streaming upstream completion
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    /// Text of the first choice, if any
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}
