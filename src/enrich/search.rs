//! Web search decision and execution through the search tier
//!
//! Both steps fail closed: an unusable answer means "no search" and an
//! unusable search means "no results".

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::{
    chat::{Message, UpstreamRequest},
    config::Config,
    error::{AppError, AppResult},
    routes::metrics::record_auxiliary_call,
    upstream::ChatProvider,
};

const SEARCH_INSTRUCTION: &str =
    "Please search the web for the following query and provide relevant information:";

/// Function tool exposing web search to the model
fn search_tools() -> Value {
    json!([{
        "type": "function",
        "function": {
            "name": "googleSearch",
            "description": "Search the web for relevant information",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }
        }
    }])
}

/// Prefix the conversation with a system instruction
fn with_system(prompt: &str, messages: &[Message]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(Message::system(prompt));
    out.extend_from_slice(messages);
    out
}

/// Decides whether a conversation needs live web results and fetches them
#[derive(Clone)]
pub struct WebSearcher {
    provider: Arc<dyn ChatProvider>,
}

impl WebSearcher {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    async fn ask(&self, config: &Config, request: &UpstreamRequest<'_>) -> AppResult<String> {
        self.provider
            .complete(&config.search, request)
            .await?
            .into_text()
            .ok_or_else(|| AppError::UpstreamError("Search model returned no content".to_string()))
    }

    /// Classify the conversation; only an exact "yes" answer means search
    #[instrument(skip_all)]
    pub async fn needs_search(&self, config: &Config, messages: &[Message]) -> bool {
        let prompt = with_system(&config.prompts.search_decision, messages);
        let request = UpstreamRequest::new(&config.search, &prompt, false);

        let result = self.ask(config, &request).await;
        record_auxiliary_call("decide", result.is_ok());

        match result {
            Ok(answer) => {
                let decision = answer.trim().to_lowercase() == "yes";
                debug!(answer = %answer.trim(), decision, "Search decision");
                decision
            }
            Err(e) => {
                warn!(error = %e, "Search decision failed, not searching");
                false
            }
        }
    }

    /// Derive search terms, then run a tool-enabled search call with them
    #[instrument(skip_all)]
    pub async fn search(&self, config: &Config, messages: &[Message]) -> Option<String> {
        let result = self.search_inner(config, messages).await;
        record_auxiliary_call("search", result.is_ok());

        match result {
            Ok(results) => Some(results),
            Err(e) => {
                warn!(error = %e, "Web search failed");
                None
            }
        }
    }

    async fn search_inner(&self, config: &Config, messages: &[Message]) -> AppResult<String> {
        let prompt = with_system(&config.prompts.search_terms, messages);
        let terms = self
            .ask(config, &UpstreamRequest::new(&config.search, &prompt, false))
            .await?;
        debug!(terms = %terms.trim(), "Search terms derived");

        let query = [Message::system(SEARCH_INSTRUCTION), Message::user(terms)];
        let request =
            UpstreamRequest::new(&config.search, &query, false).with_tools(search_tools());
        self.ask(config, &request).await
    }

    /// The whole search branch: decision then execution, honoring the switch
    pub async fn run(&self, config: &Config, messages: &[Message]) -> Option<String> {
        if !config.search_enabled || !self.needs_search(config, messages).await {
            return None;
        }
        self.search(config, messages).await
    }
}
