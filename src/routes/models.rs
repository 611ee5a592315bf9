//! Models endpoint
//!
//! The gateway exposes exactly one public model: the hybrid label.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, AppState};

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Models list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

/// List available models
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> AppResult<(StatusCode, Json<ModelsResponse>)> {
    let config = state.config_store.snapshot();

    let response = ModelsResponse {
        object: "list".to_string(),
        data: vec![Model {
            id: config.hybrid_model_name.clone(),
            object: "model".to_string(),
            created: state.started_at.timestamp(),
            owned_by: "hybrid-gateway".to_string(),
        }],
    };

    Ok((StatusCode::OK, Json(response)))
}
