//! Streaming relay with fallback
//!
//! Opens a streaming call to the primary tier and re-emits every upstream
//! chunk in the gateway's normalized shape. When the primary cannot be opened
//! or breaks at any point (transport error, error status, idle timeout,
//! malformed payload), its connection is dropped and the same composed
//! messages are streamed from the fallback tier instead. If the fallback
//! fails too, a single error event ends the stream.
//!
//! Chunks already emitted are never replayed or retracted, so a client may
//! see part of a primary answer followed by the complete fallback answer.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    chat::{
        response::{Choice, ChoiceMessage},
        ChatCompletionResponse, Delta, Message, Role, StreamChoice, StreamChunk, UpstreamChunk,
        UpstreamRequest,
    },
    config::{Config, Tier},
    error::{AppError, AppResult},
    routes::metrics::record_relay_outcome,
    streaming::{
        classify_line, format_error_event, format_sse_chunk, format_sse_done, SseLine,
        SseLineBuffer,
    },
    upstream::ChatProvider,
};

/// Message of the terminal error event
pub const ALL_MODELS_FAILED: &str = "All models failed";
const ERROR_CODE: &str = "upstream_unavailable";

/// Why an upstream stream became unusable
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no data for {0:?}")]
    Timeout(Duration),
}

impl From<AppError> for RelayError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::UpstreamStatus { status, .. } => RelayError::Status(status),
            AppError::Timeout(secs) => RelayError::Timeout(Duration::from_secs(secs)),
            other => RelayError::Transport(other.to_string()),
        }
    }
}

/// Upstream currently feeding the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Primary,
    Fallback,
}

impl Leg {
    const ORDER: [Leg; 2] = [Leg::Primary, Leg::Fallback];

    fn tier(self) -> Tier {
        match self {
            Leg::Primary => Tier::Primary,
            Leg::Fallback => Tier::Fallback,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Leg::Primary => "primary",
            Leg::Fallback => "fallback",
        }
    }
}

/// What the relay produces, in order
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A normalized chunk and the upstream that produced it
    Chunk(Leg, StreamChunk),
    /// The named upstream finished cleanly; nothing follows
    Done(Leg),
    /// Both upstreams failed; nothing follows
    Failed,
}

pub type RelayStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send>>;

/// Client sampling values that override the tier defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct Sampling {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Identity shared by every chunk of one relayed response
///
/// Taken from the first upstream chunk that carries it, so the id stays
/// stable across a primary-to-fallback switch.
#[derive(Debug, Default)]
pub struct StreamMetadata {
    id: Option<String>,
    created: Option<u64>,
}

impl StreamMetadata {
    fn observe(&mut self, chunk: &UpstreamChunk) {
        if self.id.is_none() {
            self.id = chunk.id.clone().filter(|id| !id.is_empty());
        }
        if self.created.is_none() {
            self.created = chunk.created;
        }
    }

    fn id(&mut self) -> String {
        self.id
            .get_or_insert_with(|| format!("chatcmpl-{}", Uuid::new_v4()))
            .clone()
    }

    fn created(&mut self) -> u64 {
        *self
            .created
            .get_or_insert_with(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default())
    }
}

/// Translate an upstream chunk; chunks without choices produce nothing
pub fn normalize_chunk(
    chunk: UpstreamChunk,
    metadata: &mut StreamMetadata,
    model: &str,
) -> Option<StreamChunk> {
    metadata.observe(&chunk);
    if chunk.choices.is_empty() {
        return None;
    }

    let choices = chunk
        .choices
        .into_iter()
        .enumerate()
        .map(|(index, choice)| StreamChoice {
            index: index as u32,
            delta: Delta {
                content: choice.delta.content.unwrap_or_default(),
                reasoning_content: choice.delta.reasoning_content,
            },
            finish_reason: choice.finish_reason,
        })
        .collect();

    Some(StreamChunk {
        id: metadata.id(),
        object: "chat.completion.chunk".to_string(),
        created: metadata.created(),
        model: model.to_string(),
        choices,
    })
}

/// Result of interpreting one complete SSE line
#[derive(Debug)]
enum LineOutcome {
    Chunk(StreamChunk),
    Done,
    Skip,
}

fn interpret_line(
    line: &str,
    metadata: &mut StreamMetadata,
    model: &str,
) -> Result<LineOutcome, RelayError> {
    match classify_line(line) {
        SseLine::Done => Ok(LineOutcome::Done),
        SseLine::Ignored => Ok(LineOutcome::Skip),
        SseLine::Data(payload) => {
            let chunk: UpstreamChunk = serde_json::from_str(payload)
                .map_err(|e| RelayError::Malformed(e.to_string()))?;
            Ok(normalize_chunk(chunk, metadata, model)
                .map(LineOutcome::Chunk)
                .unwrap_or(LineOutcome::Skip))
        }
    }
}

/// Streams composed messages from the primary tier with fallback
#[derive(Clone)]
pub struct StreamRelay {
    provider: Arc<dyn ChatProvider>,
}

impl StreamRelay {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Relay the composed messages; the returned stream never errors
    ///
    /// Dropping the stream (client disconnect) drops the active upstream
    /// connection with it.
    pub fn relay(&self, config: Arc<Config>, messages: Vec<Message>, sampling: Sampling) -> RelayStream {
        let provider = self.provider.clone();

        Box::pin(stream! {
            let model = config.hybrid_model_name.as_str();
            let mut metadata = StreamMetadata::default();

            for leg in Leg::ORDER {
                let upstream = config.upstream(leg.tier());
                let request = UpstreamRequest::new(upstream, &messages, true)
                    .with_overrides(sampling.max_tokens, sampling.temperature);
                let idle = upstream.timeout;

                let mut body = match provider.stream(upstream, &request).await {
                    Ok(body) => body,
                    Err(e) => {
                        let e = RelayError::from(e);
                        warn!(leg = leg.as_str(), model = %upstream.model, error = %e, "Upstream stream could not be opened");
                        continue;
                    }
                };
                debug!(leg = leg.as_str(), model = %upstream.model, "Relaying upstream stream");

                let mut buffer = SseLineBuffer::new();
                let failure = 'read: loop {
                    let next = match tokio::time::timeout(idle, body.next()).await {
                        Ok(next) => next,
                        Err(_) => break 'read RelayError::Timeout(idle),
                    };

                    let bytes = match next {
                        Some(Ok(bytes)) => bytes,
                        Some(Err(e)) => break 'read RelayError::Transport(e.to_string()),
                        None => {
                            // Only the terminal marker ends a leg; it may lack its newline
                            if classify_line(buffer.remaining().trim()) != SseLine::Done {
                                break 'read RelayError::Malformed(format!(
                                    "stream ended without [DONE]: {}",
                                    buffer.remaining().chars().take(100).collect::<String>()
                                ));
                            }
                            record_relay_outcome(leg.as_str());
                            info!(leg = leg.as_str(), "Upstream stream finished");
                            yield RelayEvent::Done(leg);
                            return;
                        }
                    };

                    for line in buffer.feed(&bytes) {
                        match interpret_line(&line, &mut metadata, model) {
                            Ok(LineOutcome::Chunk(chunk)) => yield RelayEvent::Chunk(leg, chunk),
                            Ok(LineOutcome::Skip) => {}
                            Ok(LineOutcome::Done) => {
                                record_relay_outcome(leg.as_str());
                                info!(leg = leg.as_str(), "Upstream stream finished");
                                yield RelayEvent::Done(leg);
                                return;
                            }
                            Err(e) => break 'read e,
                        }
                    }
                };

                // Release the broken connection before the next leg opens one
                drop(body);
                warn!(leg = leg.as_str(), model = %upstream.model, error = %failure, "Upstream stream failed");
            }

            record_relay_outcome("failed");
            error!("Primary and fallback streams both failed");
            yield RelayEvent::Failed;
        })
    }
}

/// Encode relay events as the client-facing SSE byte stream
pub fn into_sse(events: RelayStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    events.map(|event| {
        Ok(match event {
            RelayEvent::Chunk(_, chunk) => format_sse_chunk(&chunk),
            RelayEvent::Done(_) => format_sse_done(),
            RelayEvent::Failed => format_error_event(ALL_MODELS_FAILED, Some(ERROR_CODE)),
        })
    })
}

/// Drain relay events into one non-streaming completion
///
/// Nothing has reached the client yet, so a partial primary answer is
/// discarded once the fallback starts producing. Fails only when both
/// upstreams failed without producing any content.
pub async fn collect_completion(
    mut events: RelayStream,
    model: &str,
) -> AppResult<ChatCompletionResponse> {
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut finish_reason = None;
    let mut identity = None;
    let mut current_leg = None;

    while let Some(event) = events.next().await {
        match event {
            RelayEvent::Chunk(leg, chunk) => {
                if identity.is_none() {
                    identity = Some((chunk.id.clone(), chunk.created));
                }
                if current_leg.is_some_and(|current| current != leg) {
                    debug!(leg = leg.as_str(), discarded = content.len(), "Discarding partial answer");
                    content.clear();
                    reasoning.clear();
                    finish_reason = None;
                }
                current_leg = Some(leg);
                for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
                    content.push_str(&choice.delta.content);
                    if let Some(r) = choice.delta.reasoning_content {
                        reasoning.push_str(&r);
                    }
                    if choice.finish_reason.is_some() {
                        finish_reason = choice.finish_reason;
                    }
                }
            }
            RelayEvent::Done(_) => break,
            RelayEvent::Failed => {
                if content.is_empty() {
                    return Err(AppError::UpstreamError(ALL_MODELS_FAILED.to_string()));
                }
                break;
            }
        }
    }

    let (id, created) = identity.unwrap_or_else(|| {
        let mut metadata = StreamMetadata::default();
        (metadata.id(), metadata.created())
    });

    Ok(ChatCompletionResponse {
        id,
        object: "chat.completion".to_string(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: Role::Assistant,
                content,
                reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
            },
            finish_reason: Some(finish_reason.unwrap_or_else(|| "stop".to_string())),
        }],
    })
}
