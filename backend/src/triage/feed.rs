//! In-process change feed for job postings.

use tokio::sync::broadcast;

use crate::models::JobPosting;

/// Buffered changes per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 256;

/// A change to the posting set.
#[derive(Debug, Clone, PartialEq)]
pub enum JobChange {
    Inserted(JobPosting),
    Updated(JobPosting),
    Deleted { id: String },
    Cleared,
    Reseeded(Vec<JobPosting>),
}

impl JobChange {
    pub fn kind(&self) -> &'static str {
        match self {
            JobChange::Inserted(_) => "inserted",
            JobChange::Updated(_) => "updated",
            JobChange::Deleted { .. } => "deleted",
            JobChange::Cleared => "cleared",
            JobChange::Reseeded(_) => "reseeded",
        }
    }
}

/// Broadcasts posting changes to every open triage session.
#[derive(Debug, Clone)]
pub struct JobFeed {
    tx: broadcast::Sender<JobChange>,
}

impl Default for JobFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, change: JobChange) {
        let kind = change.kind();
        match self.tx.send(change) {
            Ok(receivers) => tracing::debug!(kind, receivers, "Published job change"),
            Err(_) => tracing::trace!(kind, "Job change dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobChange> {
        self.tx.subscribe()
    }
}
