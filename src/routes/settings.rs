//! Upstream credential endpoints
//!
//! Updates publish a new configuration snapshot; requests already in flight
//! keep the snapshot they started with.

use std::sync::Arc;

use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};

use crate::{
    config::{CredentialUpdate, Tier},
    error::{AppError, AppResult},
    AppState,
};

/// Form body of `POST /config/model`
#[derive(Debug, Deserialize)]
pub struct ModelConfigForm {
    pub model_name: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelConfigUpdated {
    pub message: String,
    pub model_name: String,
    pub base_url: String,
}

/// Per-tier view; keys are never echoed
#[derive(Debug, Serialize)]
pub struct TierInfo {
    pub name: Tier,
    pub description: &'static str,
    pub model: String,
    pub has_api_key: bool,
    pub base_url: String,
}

/// Replace a tier's API key and optionally its base URL
pub async fn update_model_config(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ModelConfigForm>,
) -> AppResult<Json<ModelConfigUpdated>> {
    let tier: Tier = form.model_name.parse().map_err(AppError::BadRequest)?;
    if form.api_key.trim().is_empty() {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }

    let config = state
        .config_store
        .update_credentials(CredentialUpdate {
            tier,
            api_key: form.api_key.trim().to_string(),
            base_url: form.base_url,
        })
        .await;

    Ok(Json(ModelConfigUpdated {
        message: format!("Configuration for {} updated", tier),
        model_name: tier.to_string(),
        base_url: config.upstream(tier).base_url.clone(),
    }))
}

/// Describe every tier's current settings
pub async fn list_model_configs(State(state): State<Arc<AppState>>) -> Json<Vec<TierInfo>> {
    let config = state.config_store.snapshot();

    Json(
        Tier::ALL
            .iter()
            .map(|&tier| {
                let upstream = config.upstream(tier);
                TierInfo {
                    name: tier,
                    description: tier.description(),
                    model: upstream.model.clone(),
                    has_api_key: upstream.api_key.is_some(),
                    base_url: upstream.base_url.clone(),
                }
            })
            .collect(),
    )
}
