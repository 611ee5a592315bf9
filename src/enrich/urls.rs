//! URL discovery and in-place content substitution

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use super::fetcher::is_valid_url;
use crate::chat::{Content, Message};

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s)]+").expect("URL pattern is valid"));

const WRAPPER_OPEN: &str = "\n\n[URL content: ";

/// Text that replaces a resolved URL
pub fn wrap_content(url: &str, text: &str) -> String {
    format!("{}{}]\n{}\n", WRAPPER_OPEN, url, text)
}

/// Distinct valid URLs across every message, in order of first appearance
///
/// Structured content is searched through its flattened text parts.
pub fn extract_urls(messages: &[Message]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for message in messages {
        let text = message.content.flattened_text();
        for found in URL_PATTERN.find_iter(&text) {
            let url = found.as_str().trim();
            if is_valid_url(url) && seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    }

    urls
}

/// Replace resolved URLs inside plain-text messages
///
/// Messages with structured content are returned unchanged. Returns a new
/// list; the input is never modified.
pub fn substitute_urls(messages: &[Message], resolved: &HashMap<String, String>) -> Vec<Message> {
    if resolved.is_empty() {
        return messages.to_vec();
    }

    let mut urls: Vec<&str> = resolved.keys().map(String::as_str).collect();
    // Longest first so a URL never shadows a longer one it prefixes
    urls.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    messages
        .iter()
        .map(|message| match &message.content {
            Content::Text(text) => Message {
                content: Content::Text(substitute_text(text, &urls, resolved)),
                ..message.clone()
            },
            Content::Parts(_) => message.clone(),
        })
        .collect()
}

/// Single left-to-right pass; inserted content is never rescanned
fn substitute_text(text: &str, urls: &[&str], resolved: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];

        if let Some(len) = existing_wrapper_len(rest, urls, resolved) {
            out.push_str(&rest[..len]);
            pos += len;
            continue;
        }

        if let Some(url) = urls.iter().find(|url| rest.starts_with(**url)) {
            out.push_str(&wrap_content(url, &resolved[*url]));
            pos += url.len();
            continue;
        }

        match rest.chars().next() {
            Some(ch) => {
                out.push(ch);
                pos += ch.len_utf8();
            }
            None => break,
        }
    }

    out
}

/// Length of an already-substituted block starting at `rest`, if any
fn existing_wrapper_len(rest: &str, urls: &[&str], resolved: &HashMap<String, String>) -> Option<usize> {
    let inner = rest.strip_prefix(WRAPPER_OPEN)?;
    urls.iter().find_map(|url| {
        let wrapped = wrap_content(url, &resolved[*url]);
        inner
            .starts_with(&wrapped[WRAPPER_OPEN.len()..])
            .then_some(wrapped.len())
    })
}
