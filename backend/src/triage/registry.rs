//! Open triage sessions and the record-then-settle loop that drives them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use super::classifier::{Gesture, Swipe, SwipeThresholds};
use super::feed::JobChange;
use super::ports::{DecisionSink, JobSource};
use super::session::{SessionView, TriageSession};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::Decision;

/// Tunables for the swipe loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriageSettings {
    pub thresholds: SwipeThresholds,
    pub settle_delay: Duration,
    pub requeue_failed: bool,
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            thresholds: SwipeThresholds::default(),
            settle_delay: Duration::from_millis(crate::config::DEFAULT_SETTLE_DELAY_MS),
            requeue_failed: false,
        }
    }
}

impl From<&Config> for TriageSettings {
    fn from(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds,
            settle_delay: config.settle_delay,
            requeue_failed: config.requeue_failed,
        }
    }
}

/// Outcome of a release.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeReport {
    pub swipe: Swipe,
    /// Whether the decision write succeeded; absent when nothing was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    pub session: SessionView,
}

struct SessionEntry {
    state: Mutex<TriageSession>,
    settle_task: Mutex<Option<JoinHandle<()>>>,
}

/// All open sessions, keyed by session id.
pub struct SessionRegistry {
    source: Arc<dyn JobSource>,
    sink: Arc<dyn DecisionSink>,
    settings: TriageSettings,
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new(
        source: Arc<dyn JobSource>,
        sink: Arc<dyn DecisionSink>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            source,
            sink,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session over a fresh copy of the queue.
    ///
    /// The session is registered, and locked, before the queue is loaded, so
    /// changes published during the load are merged on top of it.
    pub async fn create(&self) -> Result<SessionView, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = Arc::new(SessionEntry {
            state: Mutex::new(TriageSession::new(id.clone(), Vec::new())),
            settle_task: Mutex::new(None),
        });

        let mut session = entry.state.lock().await;
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::clone(&entry));

        let jobs = match self.source.list_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                drop(session);
                self.sessions.write().await.remove(&id);
                return Err(e);
            }
        };
        session.reseed(jobs);
        let view = session.view();

        tracing::info!(session_id = %id, jobs = view.total, "Opened triage session");
        Ok(view)
    }

    pub async fn view(&self, id: &str) -> Result<SessionView, AppError> {
        let entry = self.entry(id).await?;
        let session = entry.state.lock().await;
        Ok(session.view())
    }

    /// Close a session. A pending settle timer is abandoned; an in-flight write is not.
    pub async fn close(&self, id: &str) -> Result<(), AppError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| session_not_found(id))?;

        if let Some(task) = entry.settle_task.lock().await.take() {
            task.abort();
        }
        tracing::info!(session_id = %id, "Closed triage session");
        Ok(())
    }

    /// Reload the queue from the source and restart at the first card.
    pub async fn reseed(&self, id: &str) -> Result<SessionView, AppError> {
        let entry = self.entry(id).await?;

        let mut session = entry.state.lock().await;
        let jobs = self.source.list_jobs().await?;
        session.reseed(jobs);
        tracing::debug!(session_id = %id, jobs = session.jobs().len(), "Reseeded triage session");
        Ok(session.view())
    }

    pub async fn begin_drag(&self, id: &str) -> Result<SessionView, AppError> {
        let entry = self.entry(id).await?;
        let mut session = entry.state.lock().await;
        session.begin_drag()?;
        Ok(session.view())
    }

    /// Begin a drag and release it in one step.
    pub async fn swipe(&self, id: &str, gesture: Gesture) -> Result<SwipeReport, AppError> {
        self.begin_drag(id).await?;
        self.release(id, gesture).await
    }

    /// Release the drag, record any decision, then start the settle timer.
    ///
    /// The settle timer only starts once the write has finished. A failed
    /// write is logged and otherwise ignored: the queue still advances.
    pub async fn release(&self, id: &str, gesture: Gesture) -> Result<SwipeReport, AppError> {
        let entry = self.entry(id).await?;

        let pending = {
            let mut session = entry.state.lock().await;
            match session.release(gesture, &self.settings.thresholds)? {
                Some(pending) => pending,
                None => {
                    return Ok(SwipeReport {
                        swipe: Swipe::None,
                        recorded: None,
                        decision: None,
                        session: session.view(),
                    });
                }
            }
        };

        let decision = match self
            .sink
            .record_decision(&pending.job.id, pending.applied)
            .await
        {
            Ok(decision) => {
                tracing::info!(
                    session_id = %id,
                    job_id = %pending.job.id,
                    applied = pending.applied,
                    "Recorded decision"
                );
                Some(decision)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %id,
                    job_id = %pending.job.id,
                    applied = pending.applied,
                    error = %e,
                    "Failed to record decision, advancing anyway"
                );
                None
            }
        };
        let recorded = decision.is_some();

        let (current, view) = {
            let mut session = entry.state.lock().await;
            let current =
                session.mark_recorded(pending.ticket, recorded, self.settings.requeue_failed);
            (current, session.view())
        };

        if current {
            self.schedule_settle(id, &entry, pending.ticket).await;
        } else {
            tracing::debug!(session_id = %id, "Session moved on before the write finished");
        }

        Ok(SwipeReport {
            swipe: pending.swipe,
            recorded: Some(recorded),
            decision,
            session: view,
        })
    }

    async fn schedule_settle(&self, id: &str, entry: &Arc<SessionEntry>, ticket: u64) {
        let delay = self.settings.settle_delay;
        let task_entry = Arc::clone(entry);
        let session_id = id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut session = task_entry.state.lock().await;
            if session.settle(ticket) {
                tracing::debug!(session_id = %session_id, cursor = session.cursor(), "Advanced queue");
            }
        });

        *entry.settle_task.lock().await = Some(handle);
    }

    /// Merge a posting change into every open session.
    pub async fn apply_change(&self, change: &JobChange) {
        let entries: Vec<_> = self.sessions.read().await.values().cloned().collect();
        for entry in entries {
            entry.state.lock().await.apply_change(change);
        }
    }

    /// Refetch the queue for every open session, keeping each cursor.
    pub async fn refresh_all(&self) -> Result<(), AppError> {
        let jobs = self.source.list_jobs().await?;
        let entries: Vec<_> = self.sessions.read().await.values().cloned().collect();
        for entry in entries {
            entry.state.lock().await.refresh(jobs.clone());
        }
        Ok(())
    }

    /// Forward the change feed into open sessions until the feed closes.
    pub async fn follow(self: Arc<Self>, mut changes: broadcast::Receiver<JobChange>) {
        loop {
            match changes.recv().await {
                Ok(change) => self.apply_change(&change).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Job feed lagged, refetching queues");
                    if let Err(e) = self.refresh_all().await {
                        tracing::error!("Failed to refresh sessions: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Job feed closed");
    }

    async fn entry(&self, id: &str) -> Result<Arc<SessionEntry>, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| session_not_found(id))
    }
}

fn session_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Session {} not found", id))
}
