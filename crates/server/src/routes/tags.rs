//! Tag aggregation endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use trailview_core::get_tag_counts;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tags", get(list_tags))
}

/// GET /api/tags -- tag frequency over the current discovery pass.
async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let tags = get_tag_counts(&snapshot).await;
    Ok(Json(serde_json::json!({ "tags": tags })))
}
