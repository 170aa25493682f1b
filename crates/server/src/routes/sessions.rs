//! Session listing, detail, live event feed, and custom tag management.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use trailview_core::{discover_sessions, find_session, Session};

use crate::error::ApiError;
use crate::live::LiveEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/events", get(session_events))
        .route("/sessions/{id}/tags", post(add_tags))
        .route("/sessions/{id}/tags/{tag}", delete(remove_tag))
}

/// GET /api/sessions -- summary fields only, no message bodies.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let sessions: Vec<Session> = discover_sessions(&snapshot)
        .await
        .iter()
        .map(Session::without_messages)
        .collect();
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

/// GET /api/sessions/:id -- full session with messages; 404 when unknown.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.load().await?;
    let session = find_session(&snapshot, &id)
        .await
        .map_err(|_| ApiError::SessionNotFound(id))?;
    Ok(Json(serde_json::json!({ "session": session })))
}

/// GET /api/sessions/:id/events -- server-push feed of `message` and
/// `status` events. The subscription (and with it the underlying file
/// watch, once unshared) is torn down when the client disconnects and the
/// stream is dropped.
async fn session_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut subscription = state.broadcaster.subscribe(&id).await?;

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            let sse_event = match event {
                LiveEvent::Message(message) => Event::default()
                    .event("message")
                    .data(serde_json::to_string(&message).unwrap_or_default()),
                LiveEvent::Status(status) => Event::default()
                    .event("status")
                    .data(serde_json::json!({ "status": status }).to_string()),
            };
            yield Ok(sse_event);
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

#[derive(Debug, Deserialize)]
struct TagsBody {
    tags: Vec<String>,
}

/// POST /api/sessions/:id/tags -- add custom tags to a session.
async fn add_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<TagsBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.add_custom_tags(&id, &body.tags).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "tags": snapshot.custom_tags_for(&id),
    })))
}

/// DELETE /api/sessions/:id/tags/:tag -- remove one custom tag.
async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((id, tag)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.config.remove_custom_tag(&id, &tag).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "tags": snapshot.custom_tags_for(&id),
    })))
}
