//! SSE (Server-Sent Events) streaming utilities
//!
//! Line buffering and classification for upstream event streams, plus the
//! formatters for everything the gateway writes to clients.

use bytes::Bytes;
use serde::Serialize;

use crate::chat::StreamChunk;

/// Terminal marker payload of an OpenAI-style stream
pub const DONE_MARKER: &str = "[DONE]";

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// SSE data arrives as byte chunks that may not align with line boundaries.
/// This buffer accumulates incomplete lines until a complete line (ending with \n)
/// is available for processing.
///
/// # Example
/// ```
/// use hybrid_gateway::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
///
/// let lines1 = buffer.feed(b"data: {\"content\":\"hel");
/// assert!(lines1.is_empty());
///
/// let lines2 = buffer.feed(b"lo\"}\n");
/// assert_eq!(lines2, vec!["data: {\"content\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated bytes of an incomplete line
    incomplete: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// Complete lines are those ending with `\n`. The line terminator
    /// (`\n` or `\r\n`) is stripped and empty lines are dropped. Incomplete
    /// trailing data is retained for the next call, so a multi-byte character
    /// split across chunks decodes correctly.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        while let Some(newline_pos) = self.incomplete.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.incomplete.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            // SSE uses blank lines as event separators
            if !line.is_empty() {
                complete_lines.push(line.to_string());
            }
        }

        complete_lines
    }

    /// Check if there's any non-whitespace data left without a terminator.
    ///
    /// Useful for detecting truncated streams at end of response.
    pub fn has_incomplete(&self) -> bool {
        self.incomplete.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Get any remaining incomplete data.
    pub fn remaining(&self) -> String {
        String::from_utf8_lossy(&self.incomplete).into_owned()
    }
}

/// Meaning of one complete SSE line
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// A `data:` line carrying a JSON payload
    Data(&'a str),
    /// The `data: [DONE]` terminator
    Done,
    /// Comments, `event:`/`id:` fields and anything else
    Ignored,
}

/// Classify a complete line from an upstream stream
pub fn classify_line(line: &str) -> SseLine<'_> {
    match line.strip_prefix("data:") {
        Some(payload) => {
            let payload = payload.trim();
            if payload == DONE_MARKER {
                SseLine::Done
            } else if payload.is_empty() {
                SseLine::Ignored
            } else {
                SseLine::Data(payload)
            }
        }
        None => SseLine::Ignored,
    }
}

/// Format a stream chunk as an SSE data event: `data: {json}\n\n`
pub fn format_sse_chunk(chunk: &StreamChunk) -> Bytes {
    let json = serde_json::to_string(chunk).expect("StreamChunk should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}

/// Format the SSE done marker: `data: [DONE]\n\n`
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// SSE error event structure for stream errors.
#[derive(Debug, Serialize)]
struct SseErrorEvent<'a> {
    error: SseErrorDetails<'a>,
}

#[derive(Debug, Serialize)]
struct SseErrorDetails<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

/// Format an error as an SSE error event.
///
/// This is the only way a failure surfaces once a stream has started.
pub fn format_error_event(message: &str, code: Option<&str>) -> Bytes {
    let event = SseErrorEvent {
        error: SseErrorDetails {
            message,
            error_type: "stream_error",
            code,
        },
    };
    let json = serde_json::to_string(&event).expect("SseErrorEvent should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}
