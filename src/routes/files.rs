//! File management endpoints

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    storage::StoredFile,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Store the multipart field named `file`
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<StoredFile>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let stored = state.file_store.save(&filename, &data).await?;
        return Ok(Json(stored));
    }

    Err(AppError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// List stored files
pub async fn list_files(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<StoredFile>>> {
    Ok(Json(state.file_store.list().await?))
}

/// Delete a stored file
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let filename = state.file_store.delete(&name).await?;
    Ok(Json(MessageResponse {
        message: format!("File {} deleted", filename),
    }))
}
