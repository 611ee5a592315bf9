//! Hybrid gateway - OpenAI-compatible front for a multi-model pipeline
//!
//! This library provides the core functionality for the gateway server. A
//! chat request is enriched with fetched URL content, image descriptions and
//! web search results, then streamed from a primary thinking model with
//! transparent fallback to a secondary model.

pub mod chat;
pub mod config;
pub mod enrich;
pub mod error;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod storage;
pub mod streaming;
pub mod upstream;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};

pub use crate::config::{Config, ConfigStore};
pub use crate::enrich::{ContentCache, Enricher, WebContentFetcher};
pub use crate::relay::StreamRelay;
pub use crate::storage::FileStore;
pub use crate::upstream::{ChatProvider, OpenAiCompatibleClient};

/// Application state shared across all request handlers
pub struct AppState {
    /// Current configuration; handlers take one snapshot per request
    pub config_store: Arc<ConfigStore>,
    /// Backend for every model call
    pub provider: Arc<dyn ChatProvider>,
    /// Process-wide URL content cache
    pub content_cache: Arc<ContentCache>,
    pub enricher: Enricher,
    pub relay: StreamRelay,
    pub file_store: FileStore,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // One connection-pooled client serves model calls and page fetches
        let http_client = upstream::build_http_client(config.max_redirects)?;
        let provider: Arc<dyn ChatProvider> =
            Arc::new(OpenAiCompatibleClient::new(http_client.clone()));

        Ok(Self::with_provider(config, http_client, provider))
    }

    /// Create the state around an existing client and model backend
    pub fn with_provider(
        config: Config,
        http_client: reqwest::Client,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let content_cache = Arc::new(ContentCache::new(
            config.content_cache_capacity,
            config.content_cache_ttl,
        ));
        let fetcher = WebContentFetcher::new(http_client, config.request_timeout);
        let enricher = Enricher::new(provider.clone(), fetcher, content_cache.clone());
        let relay = StreamRelay::new(provider.clone());
        let file_store = FileStore::new(&config.upload_dir);

        Self {
            config_store: Arc::new(ConfigStore::new(config)),
            provider,
            content_cache,
            enricher,
            relay,
            file_store,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}
