//! Final message list assembly
//!
//! Pure and synchronous. Output order is fixed: the original messages, then
//! search context, then image context, then the relay instructions last.

use crate::{chat::Message, config::Prompts};

/// Compose the request sent to the answering models
pub fn compose(
    messages: &[Message],
    search_results: Option<&str>,
    image_descriptions: Option<&str>,
    prompts: &Prompts,
) -> Vec<Message> {
    let mut composed = Vec::with_capacity(messages.len() + 3);
    composed.extend_from_slice(messages);

    if let Some(results) = search_results.filter(|s| !s.trim().is_empty()) {
        composed.push(Message::system(format!("{}{}", prompts.search_context, results)));
    }
    if let Some(descriptions) = image_descriptions.filter(|s| !s.trim().is_empty()) {
        composed.push(Message::system(format!(
            "{}{}",
            prompts.image_context, descriptions
        )));
    }
    composed.push(Message::system(prompts.relay.as_str()));

    composed
}
