//! Directory profile aggregation and CRUD.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use trailview_core::{get_directory_list, DirectoryProfile, DirectoryUpdate};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/directories", get(list_directories).post(add_directory))
        .route(
            "/directories/{path}",
            put(update_directory).delete(remove_directory),
        )
}

/// GET /api/directories -- session counts per enabled profile.
async fn list_directories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let directories = get_directory_list(&snapshot).await;
    Ok(Json(serde_json::json!({ "directories": directories })))
}

/// POST /api/directories -- register a new profile; 409 on duplicate path.
async fn add_directory(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<DirectoryProfile>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.config.add_directory(profile).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /api/directories/:path -- partial update; 404 when unknown.
async fn update_directory(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Json(updates): Json<DirectoryUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.config.update_directory(&path, updates).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /api/directories/:path -- drop a profile (sessions stay on disk).
async fn remove_directory(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.config.remove_directory(&path).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
