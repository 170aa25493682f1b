//! Pin management: delegates to the config store; callers re-discover to
//! see the overlay reflected.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/pins/{id}", post(add_pin).delete(remove_pin))
}

/// POST /api/pins/:id
async fn add_pin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.config.add_pin(&id).await?;
    Ok(Json(serde_json::json!({ "success": true, "isPinned": true })))
}

/// DELETE /api/pins/:id
async fn remove_pin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.config.remove_pin(&id).await?;
    Ok(Json(serde_json::json!({ "success": true, "isPinned": false })))
}
