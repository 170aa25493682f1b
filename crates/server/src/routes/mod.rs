//! API route handlers for the trailview server.

pub mod config;
pub mod directories;
pub mod health;
pub mod pins;
pub mod projects;
pub mod search;
pub mod sessions;
pub mod tags;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::state::AppState;

/// Create the combined API router with all routes under the /api prefix.
///
/// Routes:
/// - GET    /api/health                     - Health check
/// - GET    /api/sessions                   - List sessions (summary fields)
/// - GET    /api/sessions/:id               - Session detail with full messages
/// - GET    /api/sessions/:id/events        - SSE feed of message/status events
/// - POST   /api/sessions/:id/tags          - Add custom tags
/// - DELETE /api/sessions/:id/tags/:tag     - Remove one custom tag
/// - GET    /api/search?q=&mode=quick|deep  - Search sessions
/// - GET    /api/directories                - Directory aggregation
/// - POST   /api/directories                - Add a directory profile
/// - PUT    /api/directories/:path          - Update a directory profile
/// - DELETE /api/directories/:path          - Remove a directory profile
/// - GET    /api/projects                   - Project aggregation
/// - GET    /api/tags                       - Tag counts
/// - POST   /api/pins/:id                   - Pin a session
/// - DELETE /api/pins/:id                   - Unpin a session
/// - GET    /api/config                     - Config contents and path
/// - PUT    /api/config                     - Replace the config
pub fn api_routes(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(sessions::router())
        .merge(search::router())
        .merge(directories::router())
        .merge(projects::router())
        .merge(tags::router())
        .merge(pins::router())
        .merge(config::router())
        .fallback(api_not_found);

    Router::new().nest("/api", api).with_state(state)
}

/// Unknown /api routes get a JSON error, not a bare 404.
async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
