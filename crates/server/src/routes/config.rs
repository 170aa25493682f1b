//! Config inspection and replacement.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use trailview_core::{ConfigSnapshot, DirectoryProfile, ServerConfig};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/config", get(get_config).put(put_config))
}

/// GET /api/config -- current config plus the file path backing it.
async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    Ok(Json(serde_json::json!({
        "config": snapshot,
        "configPath": state.config.path().display().to_string(),
    })))
}

/// Strict schema for PUT: unknown fields and a missing `directories` list
/// are rejected so a junk payload cannot silently wipe the config.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigPayload {
    directories: Vec<DirectoryProfile>,
    #[serde(default)]
    pins: Vec<String>,
    #[serde(default)]
    custom_tags: HashMap<String, Vec<String>>,
    #[serde(default)]
    server: ServerConfig,
}

/// PUT /api/config -- replace the whole config; 400 on schema violations.
async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let payload: ConfigPayload = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))?;

    let snapshot = ConfigSnapshot {
        directories: payload.directories,
        pins: payload.pins,
        custom_tags: payload.custom_tags,
        server: payload.server,
    };
    state.config.save(&snapshot).await?;
    Ok(Json(serde_json::json!({ "success": true, "config": snapshot })))
}
