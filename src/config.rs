//! Configuration management for the gateway
//!
//! Configuration is loaded from environment variables once at startup and
//! published as an immutable snapshot. Runtime credential changes go through
//! [`ConfigStore`], which swaps in a new snapshot atomically.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

const DEFAULT_RELAY_PROMPT: &str = "You are the final answering stage of a hybrid assistant. \
Use the conversation and any context provided by earlier system messages to write a complete, \
well-structured answer in the language of the user.";
const DEFAULT_SEARCH_CONTEXT_PROMPT: &str =
    "The following web search results were retrieved for this conversation:\n";
const DEFAULT_IMAGE_CONTEXT_PROMPT: &str =
    "The user attached images. A vision model described them as follows:\n";
const DEFAULT_VISION_PROMPT: &str = "Describe the image in detail. Transcribe any visible text \
verbatim and mention charts, tables or diagrams explicitly.";
const DEFAULT_SEARCH_DECISION_PROMPT: &str = "Decide whether answering the last user message \
requires up-to-date information from the web. Reply with exactly one word: yes or no.";
const DEFAULT_SEARCH_TERMS_PROMPT: &str = "Derive a concise web search query that would find \
the information needed to answer the last user message. Reply with the query only.";

/// Upstream model tiers the gateway talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Thinking model that answers first
    Primary,
    /// Output model used after the primary stream fails
    Fallback,
    /// Vision model describing attached images
    Vision,
    /// Model deciding on and performing web searches
    Search,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Primary, Tier::Fallback, Tier::Vision, Tier::Search];

    /// Environment variable prefix for this tier
    fn env_prefix(&self) -> &'static str {
        match self {
            Tier::Primary => "PRIMARY",
            Tier::Fallback => "FALLBACK",
            Tier::Vision => "VISION",
            Tier::Search => "SEARCH",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tier::Primary => "Primary thinking model",
            Tier::Fallback => "Fallback output model",
            Tier::Vision => "Image description model",
            Tier::Search => "Web search model",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Fallback => write!(f, "fallback"),
            Tier::Vision => write!(f, "vision"),
            Tier::Search => write!(f, "search"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    /// Accepts tier names plus the legacy model names used by older admin tooling.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "primary" | "deepseek_r1" => Ok(Tier::Primary),
            "fallback" | "gemini" => Ok(Tier::Fallback),
            "vision" | "image" => Ok(Tier::Vision),
            "search" => Ok(Tier::Search),
            other => Err(format!("Unsupported model tier: {}", other)),
        }
    }
}

/// Connection settings for one OpenAI-compatible upstream
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Bound on a non-streaming call, or on time-to-headers and per-read idle time when streaming
    pub timeout: Duration,
}

impl UpstreamConfig {
    /// Full chat completions endpoint URL
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn from_env(tier: Tier, timeout: Duration) -> Result<Self> {
        let prefix = tier.env_prefix();
        let (default_max_tokens, default_temperature, default_model) = match tier {
            Tier::Primary => ("7985", "0.7", "deepseek-reasoner"),
            Tier::Fallback => ("7985", "0.4", "gemini-2.0-flash"),
            Tier::Vision => ("1024", "0.3", "gemini-2.0-flash"),
            Tier::Search => ("1024", "0.3", "gemini-2.0-flash"),
        };

        Ok(Self {
            base_url: env::var(format!("{}_API_URL", prefix))
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: env::var(format!("{}_API_KEY", prefix))
                .ok()
                .filter(|k| !k.is_empty()),
            model: env::var(format!("{}_MODEL", prefix))
                .unwrap_or_else(|_| default_model.to_string()),
            max_tokens: env::var(format!("{}_MAX_TOKENS", prefix))
                .unwrap_or_else(|_| default_max_tokens.to_string())
                .parse()
                .with_context(|| format!("Invalid {}_MAX_TOKENS", prefix))?,
            temperature: env::var(format!("{}_TEMPERATURE", prefix))
                .unwrap_or_else(|_| default_temperature.to_string())
                .parse()
                .with_context(|| format!("Invalid {}_TEMPERATURE", prefix))?,
            timeout,
        })
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fixed prompt texts injected around the conversation
#[derive(Debug, Clone)]
pub struct Prompts {
    /// Trailing system message steering the answering model
    pub relay: String,
    /// Prefix of the search-context system message
    pub search_context: String,
    /// Prefix of the image-context system message
    pub image_context: String,
    /// System prompt for the vision model
    pub vision: String,
    /// Classification prompt deciding whether to search
    pub search_decision: String,
    /// Prompt deriving search terms from the conversation
    pub search_terms: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            relay: DEFAULT_RELAY_PROMPT.to_string(),
            search_context: DEFAULT_SEARCH_CONTEXT_PROMPT.to_string(),
            image_context: DEFAULT_IMAGE_CONTEXT_PROMPT.to_string(),
            vision: DEFAULT_VISION_PROMPT.to_string(),
            search_decision: DEFAULT_SEARCH_DECISION_PROMPT.to_string(),
            search_terms: DEFAULT_SEARCH_TERMS_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| env::var(key).unwrap_or(default);
        Self {
            relay: var("RELAY_PROMPT", defaults.relay),
            search_context: var("SEARCH_CONTEXT_PROMPT", defaults.search_context),
            image_context: var("IMAGE_CONTEXT_PROMPT", defaults.image_context),
            vision: var("VISION_PROMPT", defaults.vision),
            search_decision: var("SEARCH_DECISION_PROMPT", defaults.search_decision),
            search_terms: var("SEARCH_TERMS_PROMPT", defaults.search_terms),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// The single bearer secret clients must present
    pub api_key: String,
    /// Public model name reported on every response chunk
    pub hybrid_model_name: String,

    /// Default bound for every outbound call
    pub request_timeout: Duration,
    /// Redirects followed when fetching web pages
    pub max_redirects: usize,

    /// Maximum number of cached URL extractions
    pub content_cache_capacity: usize,
    /// Lifetime of a cached extraction; `None` keeps entries until evicted
    pub content_cache_ttl: Option<Duration>,

    /// Directory for uploaded files
    pub upload_dir: String,

    pub search_enabled: bool,
    pub vision_enabled: bool,

    pub primary: UpstreamConfig,
    pub fallback: UpstreamConfig,
    pub vision: UpstreamConfig,
    pub search: UpstreamConfig,

    pub prompts: Prompts,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let request_timeout = Duration::from_secs(
            env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS")?,
        );
        let cache_ttl_seconds: u64 = env::var("CONTENT_CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("Invalid CONTENT_CACHE_TTL_SECONDS")?;

        Ok(Self {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("GATEWAY_PORT")
                .unwrap_or_else(|_| "4120".to_string())
                .parse()
                .context("Invalid GATEWAY_PORT")?,

            api_key: env::var("GATEWAY_API_KEY").context("GATEWAY_API_KEY must be set")?,
            hybrid_model_name: env::var("HYBRID_MODEL_NAME")
                .unwrap_or_else(|_| "GeminiMIXR1".to_string()),

            request_timeout,
            max_redirects: env::var("REQUEST_MAX_REDIRECTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid REQUEST_MAX_REDIRECTS")?,

            content_cache_capacity: env::var("CONTENT_CACHE_CAPACITY")
                .unwrap_or_else(|_| "512".to_string())
                .parse()
                .context("Invalid CONTENT_CACHE_CAPACITY")?,
            content_cache_ttl: (cache_ttl_seconds > 0)
                .then(|| Duration::from_secs(cache_ttl_seconds)),

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),

            search_enabled: env_flag("SEARCH_ENABLED", true),
            vision_enabled: env_flag("VISION_ENABLED", true),

            primary: UpstreamConfig::from_env(Tier::Primary, request_timeout)?,
            fallback: UpstreamConfig::from_env(Tier::Fallback, request_timeout)?,
            vision: UpstreamConfig::from_env(Tier::Vision, request_timeout)?,
            search: UpstreamConfig::from_env(Tier::Search, request_timeout)?,

            prompts: Prompts::from_env(),
        })
    }

    /// Upstream settings for a tier
    pub fn upstream(&self, tier: Tier) -> &UpstreamConfig {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Fallback => &self.fallback,
            Tier::Vision => &self.vision,
            Tier::Search => &self.search,
        }
    }

    fn upstream_mut(&mut self, tier: Tier) -> &mut UpstreamConfig {
        match tier {
            Tier::Primary => &mut self.primary,
            Tier::Fallback => &mut self.fallback,
            Tier::Vision => &mut self.vision,
            Tier::Search => &mut self.search,
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Credential change requested through the admin endpoint
#[derive(Debug, Clone)]
pub struct CredentialUpdate {
    pub tier: Tier,
    pub api_key: String,
    pub base_url: Option<String>,
}

/// Holder of the current configuration snapshot
///
/// Request handlers call [`ConfigStore::snapshot`] once and use that
/// `Arc<Config>` for the whole request. Updates are serialized by a mutex and
/// published with a single atomic swap, so a request never observes a
/// half-applied change.
pub struct ConfigStore {
    current: ArcSwap<Config>,
    update_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            update_lock: Mutex::new(()),
        }
    }

    /// The configuration in effect right now
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Apply a credential update and publish the resulting snapshot
    pub async fn update_credentials(&self, update: CredentialUpdate) -> Arc<Config> {
        let _guard = self.update_lock.lock().await;

        let mut next = Config::clone(&self.current.load());
        let upstream = next.upstream_mut(update.tier);
        upstream.api_key = Some(update.api_key);
        if let Some(base_url) = update.base_url.filter(|u| !u.is_empty()) {
            upstream.base_url = base_url;
        }

        let next = Arc::new(next);
        self.current.store(next.clone());
        info!(tier = %update.tier, "Upstream credentials updated");
        next
    }
}
