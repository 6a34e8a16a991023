//! Collaborators the triage engine depends on.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Decision, JobPosting};

/// Supplies the ordered job queue, newest posting first.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<JobPosting>, AppError>;
}

/// Persists one decision per swipe.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn record_decision(&self, job_id: &str, applied: bool) -> Result<Decision, AppError>;
}
