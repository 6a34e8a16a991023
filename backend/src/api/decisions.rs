//! Decision and applied-jobs API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Decision, JobPosting, RecordDecisionRequest};
use crate::AppState;

/// Query parameters for listing decisions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionQuery {
    #[serde(default)]
    pub job_id: Option<String>,
}

/// GET /api/decisions - List recorded decisions.
pub async fn list_decisions(
    State(state): State<AppState>,
    Query(params): Query<DecisionQuery>,
) -> ApiResult<Vec<Decision>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_decisions(params.job_id.as_deref()).await {
        Ok(decisions) => success(decisions, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/decisions - Record a decision without a triage session.
pub async fn record_decision(
    State(state): State<AppState>,
    Json(request): Json<RecordDecisionRequest>,
) -> ApiResult<Decision> {
    let revision_id = current_revision(&state).await;

    if request.job_id.trim().is_empty() {
        return error(
            AppError::Validation("jobId is required".to_string()),
            revision_id,
        );
    }

    match state
        .repo
        .record_decision(&request.job_id, request.applied)
        .await
    {
        Ok(decision) => success(decision, current_revision(&state).await),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/applied - Jobs the viewer applied to.
pub async fn list_applied_jobs(State(state): State<AppState>) -> ApiResult<Vec<JobPosting>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_applied_jobs().await {
        Ok(jobs) => success(jobs, revision_id),
        Err(e) => error(e, revision_id),
    }
}
