//! Mock infrastructure for testing external services
//!
//! This module provides mock servers for the gateway's outbound traffic:
//! - OpenAI-compatible model endpoints (streaming and non-streaming)
//! - Web pages fetched for URL enrichment
//!
//! All mocks are reusable across test files and cover success, failure and
//! slow-response scenarios.


pub use pages::*;
pub use upstream::*;
