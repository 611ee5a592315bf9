//! Image description through the vision tier

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    chat::{ContentPart, Message, UpstreamRequest},
    config::Config,
    routes::metrics::record_auxiliary_call,
    upstream::ChatProvider,
};

/// Image parts of the last message; earlier turns are never described again
pub fn last_message_images(messages: &[Message]) -> Vec<&ContentPart> {
    messages
        .last()
        .map(|message| message.content.image_parts())
        .unwrap_or_default()
}

/// Describes attached images with a non-streaming vision call
#[derive(Clone)]
pub struct ImageDescriber {
    provider: Arc<dyn ChatProvider>,
}

impl ImageDescriber {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Describe one image; any failure yields `None`
    pub async fn describe(&self, config: &Config, image: &ContentPart) -> Option<String> {
        let ContentPart::ImageUrl { image_url } = image else {
            return None;
        };

        let messages = [
            Message::system(config.prompts.vision.as_str()),
            Message::user_parts(vec![image.clone()]),
        ];
        let request = UpstreamRequest::new(&config.vision, &messages, false);

        let result = self.provider.complete(&config.vision, &request).await;
        record_auxiliary_call("describe", result.is_ok());

        match result {
            Ok(response) => {
                debug!(image = %image_url.sanitized(), "Image described");
                response.into_text()
            }
            Err(e) => {
                warn!(image = %image_url.sanitized(), error = %e, "Image description failed");
                None
            }
        }
    }

    /// Describe every image of the last message concurrently
    ///
    /// Non-empty descriptions are joined with newlines; `None` when there is
    /// nothing to contribute.
    pub async fn describe_last_message(
        &self,
        config: &Config,
        messages: &[Message],
    ) -> Option<String> {
        let images = last_message_images(messages);
        if images.is_empty() {
            return None;
        }

        let descriptions = join_all(images.into_iter().map(|image| self.describe(config, image))).await;
        let joined = descriptions
            .into_iter()
            .flatten()
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        (!joined.is_empty()).then_some(joined)
    }
}
