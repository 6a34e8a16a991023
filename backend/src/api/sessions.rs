//! Triage session API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::{current_revision, error, success, ApiResult};
use crate::triage::{Gesture, SessionView, SwipeReport};
use crate::AppState;

/// Release payload: horizontal offset (px) and velocity (px/s) at pointer up.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub dx: f64,
    #[serde(default)]
    pub vx: f64,
}

impl From<ReleaseRequest> for Gesture {
    fn from(request: ReleaseRequest) -> Self {
        Gesture::new(request.dx, request.vx)
    }
}

/// POST /api/sessions - Open a triage session over the current jobs.
pub async fn create_session(State(state): State<AppState>) -> ApiResult<SessionView> {
    let revision_id = current_revision(&state).await;

    match state.sessions.create().await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/sessions/:id - Current view of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionView> {
    let revision_id = current_revision(&state).await;

    match state.sessions.view(&id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/sessions/:id - Close a session.
pub async fn close_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = current_revision(&state).await;

    match state.sessions.close(&id).await {
        Ok(()) => success((), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sessions/:id/reseed - Reload the queue and restart at the first card.
pub async fn reseed_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionView> {
    let revision_id = current_revision(&state).await;

    match state.sessions.reseed(&id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sessions/:id/drag - Pointer down on the focused card.
pub async fn begin_drag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionView> {
    let revision_id = current_revision(&state).await;

    match state.sessions.begin_drag(&id).await {
        Ok(view) => success(view, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sessions/:id/release - Pointer up after a drag.
pub async fn release_drag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReleaseRequest>,
) -> ApiResult<SwipeReport> {
    let revision_id = current_revision(&state).await;

    match state.sessions.release(&id, request.into()).await {
        Ok(report) => success(report, current_revision(&state).await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sessions/:id/swipe - Drag and release in one request.
pub async fn swipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReleaseRequest>,
) -> ApiResult<SwipeReport> {
    let revision_id = current_revision(&state).await;

    match state.sessions.swipe(&id, request.into()).await {
        Ok(report) => success(report, current_revision(&state).await),
        Err(e) => error(e, revision_id),
    }
}
