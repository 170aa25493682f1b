//! Quick and deep search endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use trailview_core::{search_sessions, SearchMode, Session};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    mode: SearchMode,
}

/// GET /api/search?q=<text>&mode=quick|deep
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let results: Vec<Session> = search_sessions(&snapshot, &params.q, params.mode)
        .await
        .iter()
        .map(Session::without_messages)
        .collect();
    Ok(Json(serde_json::json!({ "results": results })))
}
