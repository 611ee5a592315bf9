//! Chat completion data model
//!
//! Wire types shared by the HTTP surface, the enrichment pipeline and the
//! stream relay.

pub mod request;
pub mod response;
pub mod types;

pub use request::{ChatCompletionRequest, UpstreamRequest};
pub use response::{
    ChatCompletionResponse, CompletionResponse, Delta, StreamChoice, StreamChunk, UpstreamChunk,
};
pub use types::{Content, ContentPart, ImageUrl, Message, Role};
