//! Authentication middleware
//!
//! Checks the static bearer secret configured for the gateway.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{error::AppError, AppState};

/// Extract the Authorization header and return the bearer token
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// SHA-256 digest of a token
pub fn hash_token(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Compare a presented token with the configured secret
///
/// Digests are compared rather than the raw strings, so the comparison time
/// does not depend on how long a common prefix is.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    hash_token(presented) == hash_token(expected)
}

/// Authentication middleware
///
/// - Missing header → 401 `UNAUTHORIZED`
/// - Non-Bearer scheme or wrong secret → 401 `INVALID_TOKEN`
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = extract_bearer_token(auth_header).ok_or(AppError::InvalidToken)?;

    let config = state.config_store.snapshot();
    if !token_matches(token, &config.api_key) {
        warn!(
            token_hash = %hex::encode(&hash_token(token)[..8]),
            "Rejected request with invalid token"
        );
        return Err(AppError::InvalidToken);
    }

    debug!("Request authenticated");
    Ok(next.run(request).await)
}
