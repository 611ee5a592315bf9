//! OpenAI-compatible upstream client
//!
//! Sends chat completion requests to any endpoint speaking the OpenAI
//! `/chat/completions` protocol.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{headers::build_default_headers, ByteStream, ChatProvider};
use crate::{
    chat::{CompletionResponse, UpstreamRequest},
    config::UpstreamConfig,
    error::{AppError, AppResult},
};

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    /// Create a client on top of the shared connection pool
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request_builder(
        &self,
        upstream: &UpstreamConfig,
        request: &UpstreamRequest<'_>,
    ) -> AppResult<reqwest::RequestBuilder> {
        Ok(self
            .client
            .post(upstream.chat_completions_url())
            .headers(build_default_headers(upstream.api_key.as_deref())?)
            .json(request))
    }

    /// Turn a non-success response into an error carrying a body excerpt
    async fn ensure_success(response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: String = text.chars().take(500).collect();
        Err(AppError::UpstreamStatus {
            status: status.as_u16(),
            body,
        })
    }

    fn map_send_error(upstream: &UpstreamConfig, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(upstream.timeout.as_secs())
        } else {
            AppError::HttpError(e)
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleClient {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    #[instrument(skip(self, upstream, request), fields(model = %upstream.model))]
    async fn complete(
        &self,
        upstream: &UpstreamConfig,
        request: &UpstreamRequest<'_>,
    ) -> AppResult<CompletionResponse> {
        let response = self
            .request_builder(upstream, request)?
            .timeout(upstream.timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(upstream, e))?;

        let response = Self::ensure_success(response).await?;
        let parsed = response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| Self::map_send_error(upstream, e))?;

        debug!(choices = parsed.choices.len(), "Upstream completion received");
        Ok(parsed)
    }

    #[instrument(skip(self, upstream, request), fields(model = %upstream.model))]
    async fn stream(
        &self,
        upstream: &UpstreamConfig,
        request: &UpstreamRequest<'_>,
    ) -> AppResult<ByteStream> {
        let send = self.request_builder(upstream, request)?.send();

        let response = match tokio::time::timeout(upstream.timeout, send).await {
            Ok(result) => result.map_err(|e| Self::map_send_error(upstream, e))?,
            Err(_) => {
                warn!(
                    timeout_secs = upstream.timeout.as_secs(),
                    "Upstream stream did not respond in time"
                );
                return Err(AppError::Timeout(upstream.timeout.as_secs()));
            }
        };

        let response = Self::ensure_success(response).await?;
        debug!(status = %response.status(), "Upstream stream opened");

        Ok(Box::pin(response.bytes_stream()))
    }
}
