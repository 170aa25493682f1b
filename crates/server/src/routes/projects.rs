//! Project aggregation endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use trailview_core::get_project_list;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/projects", get(list_projects))
}

/// GET /api/projects -- session counts grouped by project.
async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let projects = get_project_list(&snapshot).await;
    Ok(Json(serde_json::json!({ "projects": projects })))
}
