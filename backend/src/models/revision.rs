//! Revision model for change detection.

use serde::{Deserialize, Serialize};

/// Current write revision of the job board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
