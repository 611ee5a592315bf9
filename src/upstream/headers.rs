//! Header utilities for upstream calls
//!
//! Client headers are never forwarded; every upstream request carries only
//! the tier's own credentials and a JSON content type.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{AppError, AppResult};

/// Build default headers for model requests
pub fn build_default_headers(api_key: Option<&str>) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(api_key) = api_key {
        let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid API key format")))?;
        headers.insert(AUTHORIZATION, value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(headers)
}
