//! Web page fetching and main-content extraction
//!
//! Fetch failures are values, never panics or request-level errors: a page
//! that cannot be read simply contributes nothing.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Elements removed before any text is read
const STRIP_SELECTOR: &str =
    r#"script, style, iframe, video, [class*="banner"], [class*="advert"], [class*="ads"]"#;

/// Content regions tried in order; the first one yielding a paragraph wins
const CONTENT_SELECTORS: [&str; 7] = [
    "article",
    r#"[class*="article"]"#,
    r#"[class*="content"]"#,
    "main",
    "#main",
    ".text",
    ".body",
];

const PARAGRAPH_SELECTOR: &str = "p, h2, h3, h4, li";

/// Paragraphs at or below this many characters are navigation noise
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Why a URL produced no content
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Check a candidate URL has both a scheme and a host
pub fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate.trim())
        .map(|url| !url.scheme().is_empty() && url.has_host())
        .unwrap_or(false)
}

/// Fetches pages and reduces them to title plus body text
#[derive(Clone)]
pub struct WebContentFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl WebContentFetcher {
    /// Create a fetcher on the shared client; redirects follow the client's policy
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// GET a page and extract its readable content
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !is_valid_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self
            .client
            .get(url.trim())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await.map_err(map_transport_error)?;
        let text = extract_page(&html);
        debug!(bytes = html.len(), extracted = text.len(), "Page extracted");
        Ok(text)
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e)
    }
}

/// Reduce an HTML document to `"Title: …\n\nBody:\n…"`
pub fn extract_page(html: &str) -> String {
    let mut document = Html::parse_document(html);
    strip_noise(&mut document);

    let title = extract_title(&document);
    let body = extract_body(&document);

    format!("Title: {}\n\nBody:\n{}", title, body)
}

fn strip_noise(document: &mut Html) {
    let Ok(selector) = Selector::parse(STRIP_SELECTOR) else {
        return;
    };
    let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(element_text)
}

fn extract_title(document: &Html) -> String {
    ["h1", r#"[class*="title"]"#, "title"]
        .iter()
        .find_map(|selector| first_text(document, selector))
        .unwrap_or_default()
}

/// Qualifying paragraph texts inside one region
fn paragraphs_in(region: ElementRef<'_>, paragraph: &Selector) -> Vec<String> {
    region
        .select(paragraph)
        .filter(|el| el.id() != region.id())
        .map(element_text)
        .filter(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect()
}

fn extract_body(document: &Html) -> String {
    let Ok(paragraph) = Selector::parse(PARAGRAPH_SELECTOR) else {
        return String::new();
    };

    for selector in CONTENT_SELECTORS {
        let Ok(region_selector) = Selector::parse(selector) else {
            continue;
        };
        // Only the first matching region is considered per selector
        if let Some(region) = document.select(&region_selector).next() {
            let paragraphs = paragraphs_in(region, &paragraph);
            if !paragraphs.is_empty() {
                return paragraphs.join("\n\n");
            }
        }
    }

    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&body_selector)
        .next()
        .map(|body| paragraphs_in(body, &paragraph).join("\n\n"))
        .unwrap_or_default()
}
