//! Job posting API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateJobRequest, JobPosting, UpdateJobRequest};
use crate::triage::JobChange;
use crate::AppState;

/// Result of a bulk delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearJobsResponse {
    pub deleted: u64,
}

/// GET /api/jobs - List all jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Vec<JobPosting>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_jobs().await {
        Ok(jobs) => success(jobs, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/jobs/:id - Get a single job.
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<JobPosting> {
    let revision_id = current_revision(&state).await;

    match state.repo.get_job(&id).await {
        Ok(Some(job)) => success(job, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Job {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/jobs - Create a job.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<JobPosting> {
    let revision_id = current_revision(&state).await;

    let request = match request.validate() {
        Ok(request) => request,
        Err(msg) => return error(AppError::Validation(msg), revision_id),
    };

    match state.repo.create_job(&request).await {
        Ok(job) => {
            if let Err(e) = state.search.index_job(&job).await {
                tracing::warn!(job_id = %job.id, "Failed to index job: {}", e);
            }
            state.feed.publish(JobChange::Inserted(job.clone()));

            tracing::info!(job_id = %job.id, title = %job.title, "Created job");
            success(job, current_revision(&state).await)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/jobs/:id - Update a job.
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateJobRequest>,
) -> ApiResult<JobPosting> {
    let revision_id = current_revision(&state).await;

    match state.repo.update_job(&id, &request).await {
        Ok(job) => {
            if let Err(e) = state.search.index_job(&job).await {
                tracing::warn!(job_id = %job.id, "Failed to re-index job: {}", e);
            }
            state.feed.publish(JobChange::Updated(job.clone()));

            success(job, current_revision(&state).await)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/jobs/:id - Delete a job.
pub async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = current_revision(&state).await;

    match state.repo.delete_job(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_job(&id).await {
                tracing::warn!(job_id = %id, "Failed to remove job from index: {}", e);
            }
            state.feed.publish(JobChange::Deleted { id: id.clone() });

            tracing::info!(job_id = %id, "Deleted job");
            success((), current_revision(&state).await)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/jobs - Delete every job.
pub async fn clear_jobs(State(state): State<AppState>) -> ApiResult<ClearJobsResponse> {
    let revision_id = current_revision(&state).await;

    match state.repo.clear_jobs().await {
        Ok(deleted) => {
            if let Err(e) = state.search.rebuild(&[]).await {
                tracing::warn!("Failed to clear search index: {}", e);
            }
            state.feed.publish(JobChange::Cleared);

            tracing::info!(deleted, "Cleared all jobs");
            success(ClearJobsResponse { deleted }, current_revision(&state).await)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/jobs/seed - Replace all jobs with the demo set.
pub async fn seed_jobs(State(state): State<AppState>) -> ApiResult<Vec<JobPosting>> {
    let revision_id = current_revision(&state).await;

    match state.repo.replace_jobs(&demo_jobs()).await {
        Ok(jobs) => {
            if let Err(e) = state.search.rebuild(&jobs).await {
                tracing::warn!("Failed to rebuild search index: {}", e);
            }
            state.feed.publish(JobChange::Reseeded(jobs.clone()));

            tracing::info!(jobs = jobs.len(), "Seeded demo jobs");
            success(jobs, current_revision(&state).await)
        }
        Err(e) => error(e, revision_id),
    }
}

fn demo_job(title: &str, company: &str, location: &str, description: &str) -> CreateJobRequest {
    CreateJobRequest {
        title: title.to_string(),
        company: company.to_string(),
        location: Some(location.to_string()),
        description: description.to_string(),
        job_type: None,
        salary: None,
        contact_email: None,
        skills: Vec::new(),
    }
}

/// Demo postings, newest first.
pub fn demo_jobs() -> Vec<CreateJobRequest> {
    vec![
        demo_job(
            "Frontend Engineer (React + TypeScript)",
            "Arcadia Labs",
            "Remote",
            "Own features across our React + Vite stack. Strong CSS skills and accessibility focus required. Experience with charts or visualization is a plus.",
        ),
        demo_job(
            "Platform Engineer (Node.js)",
            "Nimbus Cloud",
            "NYC · Hybrid",
            "Design resilient APIs, CI/CD pipelines, and observability. Node.js, Postgres, Redis, and Kubernetes exposure helpful.",
        ),
        demo_job(
            "Mobile Engineer (React Native)",
            "GoMobile",
            "SF · Onsite",
            "Deliver polished mobile experiences. Familiarity with native modules, OTA updates, and analytics required.",
        ),
        demo_job(
            "Data Engineer",
            "DataForge",
            "Remote",
            "Build pipelines, model data, and enable analytics. Python, SQL, dbt, and modern warehousing preferred.",
        ),
    ]
}
