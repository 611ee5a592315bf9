//! Request enrichment pipeline
//!
//! Resolves URLs found in the conversation, then runs image description and
//! the web-search branch concurrently, and finally composes the message list
//! for the answering models. Every auxiliary failure degrades to "no
//! contribution"; nothing here can fail a request.

pub mod cache;
pub mod composer;
pub mod fetcher;
pub mod images;
pub mod search;
pub mod urls;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

pub use cache::ContentCache;
pub use fetcher::{FetchError, WebContentFetcher};
pub use images::ImageDescriber;
pub use search::WebSearcher;

use crate::{
    chat::Message, config::Config, routes::metrics::record_auxiliary_call,
    upstream::ChatProvider,
};

/// Runs every enrichment step for one request
#[derive(Clone)]
pub struct Enricher {
    cache: Arc<ContentCache>,
    fetcher: WebContentFetcher,
    images: ImageDescriber,
    searcher: WebSearcher,
}

impl Enricher {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        fetcher: WebContentFetcher,
        cache: Arc<ContentCache>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            images: ImageDescriber::new(provider.clone()),
            searcher: WebSearcher::new(provider),
        }
    }

    /// Resolve every URL in the conversation and substitute fetched content
    ///
    /// Uncached URLs are fetched concurrently; each carries its own timeout,
    /// so one slow page never delays the others past their own deadline.
    #[instrument(skip_all)]
    pub async fn preprocess(&self, messages: &[Message]) -> Vec<Message> {
        let urls = urls::extract_urls(messages);
        if urls.is_empty() {
            return messages.to_vec();
        }

        let mut resolved = HashMap::new();
        let mut to_fetch = Vec::new();
        for url in urls {
            match self.cache.get(&url) {
                Some(text) => {
                    resolved.insert(url, text);
                }
                None => to_fetch.push(url),
            }
        }

        let fetched = join_all(to_fetch.iter().map(|url| self.fetcher.fetch(url))).await;
        for (url, result) in to_fetch.into_iter().zip(fetched) {
            record_auxiliary_call("fetch", result.is_ok());
            match result {
                Ok(text) => {
                    self.cache.insert(&url, text.clone());
                    resolved.insert(url, text);
                }
                Err(e) => warn!(url = %url, error = %e, "URL fetch failed"),
            }
        }

        debug!(resolved = resolved.len(), "URLs resolved");
        urls::substitute_urls(messages, &resolved)
    }

    /// Produce the composed message list for the answering models
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn enrich(&self, config: &Config, messages: &[Message]) -> Vec<Message> {
        let processed = self.preprocess(messages).await;

        let describe = async {
            if config.vision_enabled {
                self.images.describe_last_message(config, &processed).await
            } else {
                None
            }
        };
        let search = self.searcher.run(config, &processed);
        let (image_descriptions, search_results) = tokio::join!(describe, search);

        info!(
            searched = search_results.is_some(),
            described = image_descriptions.is_some(),
            "Enrichment complete"
        );

        composer::compose(
            &processed,
            search_results.as_deref(),
            image_descriptions.as_deref(),
            &config.prompts,
        )
    }
}
