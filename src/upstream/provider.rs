//! Chat provider abstraction
//!
//! Defines the seam between the gateway's pipeline and the concrete HTTP
//! client, so components can be exercised against any OpenAI-compatible
//! backend.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::{
    chat::{CompletionResponse, UpstreamRequest},
    config::UpstreamConfig,
    error::AppResult,
};

/// Stream type for streaming responses from upstreams
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Trait defining the interface for chat completion backends
///
/// Implementations MUST:
/// - Never forward client Authorization headers upstream
/// - Use the credentials of the `UpstreamConfig` passed in
/// - Bound every call with `UpstreamConfig::timeout`
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Chat completion (non-streaming)
    async fn complete(
        &self,
        upstream: &UpstreamConfig,
        request: &UpstreamRequest<'_>,
    ) -> AppResult<CompletionResponse>;

    /// Chat completion (streaming)
    ///
    /// Resolves once response headers arrive with a success status; the
    /// returned stream yields raw SSE bytes.
    async fn stream(
        &self,
        upstream: &UpstreamConfig,
        request: &UpstreamRequest<'_>,
    ) -> AppResult<ByteStream>;
}
