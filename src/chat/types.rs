//! Core message types
//!
//! Defines roles, content parts and messages. Messages are treated as
//! immutable values: every pipeline stage builds a new list.

use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing instructions or context
    System,
    /// User message from the human
    User,
    /// Assistant message from the AI
    Assistant,
}

/// Image URL reference for multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    /// URL of the image (can be data URL or HTTP URL)
    pub url: String,
    /// Image detail level: "auto", "low", or "high"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ImageUrl {
    /// Loggable form of the reference; inline data is truncated
    pub fn sanitized(&self) -> String {
        if self.url.starts_with("data:") {
            let head: String = self.url.chars().take(20).collect();
            format!("{}...[base64]...", head)
        } else {
            self.url.clone()
        }
    }
}

/// A part of multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content
    Text {
        /// The text content
        text: String,
    },
    /// Image URL reference
    ImageUrl {
        /// The image URL details
        image_url: ImageUrl,
    },
}

/// Message content - either plain text or multimodal parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    /// Simple text content
    Text(String),
    /// Multimodal content with text and/or images
    Parts(Vec<ContentPart>),
}

impl Content {
    /// All text in this content, text parts joined by newlines
    pub fn flattened_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Image parts of this content, in order
    pub fn image_parts(&self) -> Vec<&ContentPart> {
        match self {
            Content::Text(_) => Vec::new(),
            Content::Parts(parts) => parts
                .iter()
                .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
                .collect(),
        }
    }
}

/// A chat message with role and content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// The role of the message author
    pub role: Role,
    /// The content of the message
    pub content: Content,
    /// Optional name of the author (for multi-user scenarios)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Plain-text system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
            name: None,
        }
    }

    /// Plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
            name: None,
        }
    }

    /// User message carrying a list of parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: Content::Parts(parts),
            name: None,
        }
    }
}
