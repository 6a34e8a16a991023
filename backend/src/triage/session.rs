//! Per-viewer triage session state machine.
//!
//! A session owns its queue snapshot and cursor. Every transition is a method
//! on [`TriageSession`]; nothing here performs I/O or sleeps, so the registry
//! decides when the decision write happens and when the settle timer fires.

use serde::Serialize;

use super::classifier::{classify, Gesture, Swipe, SwipeThresholds};
use super::feed::JobChange;
use crate::models::JobPosting;

/// Cards rendered at once: the focused one plus the two behind it.
pub const STACK_DEPTH: usize = 3;
/// Scale lost per card of depth in the stack.
const STACK_SCALE_STEP: f64 = 0.04;
/// Vertical offset per card of depth in the stack (px).
const STACK_OFFSET_STEP: f64 = 14.0;

pub const CAUGHT_UP_MESSAGE: &str = "You're all caught up!";
pub const EMPTY_MESSAGE: &str = "No jobs available.";

/// Externally visible phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Card at rest, waiting for input.
    Idle,
    /// Pointer down on the focused card.
    Dragging,
    /// Released past a threshold; decision write in flight.
    Deciding,
    /// Decision settled; waiting out the settle delay.
    Settling,
    /// Cursor is past the end of the queue.
    Exhausted,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Dragging => "dragging",
            Phase::Deciding => "deciding",
            Phase::Settling => "settling",
            Phase::Exhausted => "exhausted",
        }
    }
}

/// Transition rejected by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageError {
    /// A decision for the focused card has not settled yet.
    Busy(Phase),
    /// Release without a preceding drag.
    NotDragging(Phase),
    /// No card left to act on.
    Exhausted,
}

impl TriageError {
    pub fn phase(&self) -> Phase {
        match self {
            TriageError::Busy(phase) | TriageError::NotDragging(phase) => *phase,
            TriageError::Exhausted => Phase::Exhausted,
        }
    }
}

impl std::fmt::Display for TriageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriageError::Busy(phase) => {
                write!(f, "Previous decision still {}", phase.as_str())
            }
            TriageError::NotDragging(phase) => {
                write!(f, "No drag in progress (session is {})", phase.as_str())
            }
            TriageError::Exhausted => write!(f, "No jobs left in the queue"),
        }
    }
}

impl std::error::Error for TriageError {}

/// A decision the caller must persist before the session can settle.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDecision {
    pub ticket: u64,
    pub job: JobPosting,
    pub swipe: Swipe,
    pub applied: bool,
}

/// Internal bookkeeping for the in-flight decision.
#[derive(Debug, Clone)]
struct InFlight {
    ticket: u64,
    job: JobPosting,
    swipe: Swipe,
    /// Cleared when the focused card disappears from the queue mid-decision.
    advance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Dragging,
    Deciding,
    Settling,
}

/// One viewer's pass over the job queue.
#[derive(Debug, Clone)]
pub struct TriageSession {
    id: String,
    jobs: Vec<JobPosting>,
    cursor: usize,
    stage: Stage,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl TriageSession {
    pub fn new(id: impl Into<String>, jobs: Vec<JobPosting>) -> Self {
        Self {
            id: id.into(),
            jobs,
            cursor: 0,
            stage: Stage::Idle,
            in_flight: None,
            next_ticket: 1,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn jobs(&self) -> &[JobPosting] {
        &self.jobs
    }

    /// The focused card, if any.
    pub fn current(&self) -> Option<&JobPosting> {
        self.jobs.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.jobs.len()
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Idle if self.is_exhausted() => Phase::Exhausted,
            Stage::Idle => Phase::Idle,
            Stage::Dragging => Phase::Dragging,
            Stage::Deciding => Phase::Deciding,
            Stage::Settling => Phase::Settling,
        }
    }

    /// Label shown while a decision is pending.
    pub fn status(&self) -> Option<&'static str> {
        self.in_flight
            .as_ref()
            .and_then(|flight| flight.swipe.status_label())
    }

    /// Pointer down on the focused card. Repeated calls while dragging are no-ops.
    pub fn begin_drag(&mut self) -> Result<(), TriageError> {
        match self.phase() {
            Phase::Idle => {
                self.stage = Stage::Dragging;
                Ok(())
            }
            Phase::Dragging => Ok(()),
            Phase::Exhausted => Err(TriageError::Exhausted),
            phase @ (Phase::Deciding | Phase::Settling) => Err(TriageError::Busy(phase)),
        }
    }

    /// Pointer up. Returns the decision to record, or `None` when the card springs back.
    pub fn release(
        &mut self,
        gesture: Gesture,
        thresholds: &SwipeThresholds,
    ) -> Result<Option<PendingDecision>, TriageError> {
        match self.phase() {
            Phase::Dragging => {}
            Phase::Exhausted => return Err(TriageError::Exhausted),
            phase @ (Phase::Deciding | Phase::Settling) => return Err(TriageError::Busy(phase)),
            phase @ Phase::Idle => return Err(TriageError::NotDragging(phase)),
        }

        let swipe = classify(gesture, thresholds);
        let (Some(applied), Some(job)) = (swipe.applied(), self.current().cloned()) else {
            self.stage = Stage::Idle;
            return Ok(None);
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.stage = Stage::Deciding;
        self.in_flight = Some(InFlight {
            ticket,
            job: job.clone(),
            swipe,
            advance: true,
        });

        Ok(Some(PendingDecision {
            ticket,
            job,
            swipe,
            applied,
        }))
    }

    /// The decision write for `ticket` finished. Returns false when the ticket is stale.
    ///
    /// A failed write is not retried. With `requeue` set the card is appended
    /// to the end of the queue so the viewer meets it again.
    pub fn mark_recorded(&mut self, ticket: u64, recorded: bool, requeue: bool) -> bool {
        if self.stage != Stage::Deciding {
            return false;
        }
        let Some(flight) = self.in_flight.as_ref().filter(|f| f.ticket == ticket) else {
            return false;
        };

        if !recorded && requeue && flight.advance {
            self.jobs.push(flight.job.clone());
        }
        self.stage = Stage::Settling;
        true
    }

    /// Settle delay elapsed: clear the label and move to the next card.
    /// Returns false when the ticket is stale.
    pub fn settle(&mut self, ticket: u64) -> bool {
        if self.stage != Stage::Settling {
            return false;
        }
        let advance = match self.in_flight.take() {
            Some(flight) if flight.ticket == ticket => flight.advance,
            other => {
                self.in_flight = other;
                return false;
            }
        };

        if advance {
            self.cursor += 1;
        }
        self.stage = Stage::Idle;
        true
    }

    /// Replace the queue and start over from the first card.
    pub fn reseed(&mut self, jobs: Vec<JobPosting>) {
        self.jobs = jobs;
        self.cursor = 0;
        self.stage = Stage::Idle;
        self.in_flight = None;
    }

    /// Replace the queue after a refetch, keeping focus on the same posting.
    ///
    /// When the focused posting is gone, focus moves to whatever follows the
    /// last card passed. Failing that the cursor keeps its index.
    pub fn refresh(&mut self, jobs: Vec<JobPosting>) {
        let position_of = |id: &str| jobs.iter().position(|j| j.id == id);

        let focused = self.current().and_then(|job| position_of(&job.id));
        let after_previous = self
            .cursor
            .checked_sub(1)
            .and_then(|prev| self.jobs.get(prev))
            .and_then(|job| position_of(&job.id))
            .map(|pos| pos + 1);

        self.cursor = focused
            .or(after_previous)
            .unwrap_or_else(|| self.cursor.min(jobs.len()));
        self.jobs = jobs;
    }

    /// Merge a change to the posting set into this session's queue.
    pub fn apply_change(&mut self, change: &JobChange) {
        match change {
            JobChange::Inserted(job) => {
                if !self.jobs.iter().any(|j| j.id == job.id) {
                    self.jobs.push(job.clone());
                }
            }
            JobChange::Updated(job) => {
                if let Some(slot) = self.jobs.iter_mut().find(|j| j.id == job.id) {
                    *slot = job.clone();
                }
            }
            JobChange::Deleted { id } => self.remove_job(id),
            JobChange::Cleared => self.reseed(Vec::new()),
            JobChange::Reseeded(jobs) => self.reseed(jobs.clone()),
        }
    }

    fn remove_job(&mut self, id: &str) {
        while let Some(pos) = self.jobs.iter().position(|j| j.id == id) {
            self.jobs.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            } else if pos == self.cursor {
                // The next card slid into the focused slot.
                if let Some(flight) = self.in_flight.as_mut() {
                    if flight.job.id == id {
                        flight.advance = false;
                    }
                }
                if self.stage == Stage::Dragging {
                    self.stage = Stage::Idle;
                }
            }
        }
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> SessionView {
        let stack = self
            .jobs
            .iter()
            .skip(self.cursor)
            .take(STACK_DEPTH)
            .enumerate()
            .map(|(depth, job)| CardView {
                depth,
                scale: 1.0 - depth as f64 * STACK_SCALE_STEP,
                y_offset: depth as f64 * STACK_OFFSET_STEP,
                job: job.clone(),
            })
            .collect();

        let message = match (self.is_exhausted(), self.jobs.is_empty()) {
            (true, true) => Some(EMPTY_MESSAGE),
            (true, false) => Some(CAUGHT_UP_MESSAGE),
            _ => None,
        };

        SessionView {
            id: self.id.clone(),
            phase: self.phase(),
            cursor: self.cursor,
            total: self.jobs.len(),
            position: (!self.is_exhausted())
                .then(|| format!("{} / {}", self.cursor + 1, self.jobs.len())),
            status: self.status(),
            message,
            stack,
        }
    }
}

/// A card in the rendered stack.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub depth: usize,
    pub scale: f64,
    pub y_offset: f64,
    pub job: JobPosting,
}

/// Render snapshot of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub phase: Phase,
    pub cursor: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub stack: Vec<CardView>,
}
