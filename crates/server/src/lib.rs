// crates/server/src/lib.rs
//! Trailview server library.
//!
//! Axum-based HTTP surface over the trailview core engine: session listing
//! and detail, live SSE feeds, search, aggregations, and config management.

pub mod error;
pub mod live;
pub mod routes;
pub mod state;

pub use error::*;
pub use live::{Broadcaster, LiveEvent, Subscription};
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use trailview_core::ConfigStore;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under /api
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(config: ConfigStore) -> Router {
    create_app_with_static(config, None)
}

/// Like [`create_app`], additionally serving a static frontend directory
/// for every non-API path (API-only mode when `None`).
pub fn create_app_with_static(config: ConfigStore, static_dir: Option<PathBuf>) -> Router {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new().merge(api_routes(state));

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
