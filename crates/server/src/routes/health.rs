//! Health check endpoint.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /api/health -- liveness probe with version and uptime.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.start_time.elapsed().as_secs(),
    }))
}
