//! Upstream module
//!
//! Handles calls to OpenAI-compatible model endpoints over one shared,
//! connection-pooled HTTP client.

pub mod headers;
pub mod openai;
pub mod provider;

use std::time::Duration;

use anyhow::Result;

pub use openai::OpenAiCompatibleClient;
pub use provider::{ByteStream, ChatProvider};

/// Build the HTTP client shared by every outbound call
///
/// No overall request timeout is set here: each call applies its own bound so
/// long-lived streams are not cut off.
pub fn build_http_client(max_redirects: usize) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(100)
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(max_redirects))
        .user_agent(concat!("hybrid-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
