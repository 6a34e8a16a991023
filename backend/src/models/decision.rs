//! Swipe decision model.

use serde::{Deserialize, Serialize};

/// A persisted accept/reject action on a job posting. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: String,
    pub job_id: String,
    pub applied: bool,
    pub created_at: String,
}

/// Request body for recording a decision outside a triage session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDecisionRequest {
    pub job_id: String,
    pub applied: bool,
}
