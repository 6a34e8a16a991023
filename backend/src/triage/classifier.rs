//! Gesture classification for swipe cards.

use serde::{Deserialize, Serialize};

/// Horizontal drag distance, in pixels, past which a release counts as a swipe.
pub const DISTANCE_THRESHOLD: f64 = 140.0;
/// Horizontal release velocity, in pixels per second, past which a flick counts as a swipe.
pub const VELOCITY_THRESHOLD: f64 = 700.0;

/// Thresholds a release must cross to become a decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipeThresholds {
    pub distance: f64,
    pub velocity: f64,
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self {
            distance: DISTANCE_THRESHOLD,
            velocity: VELOCITY_THRESHOLD,
        }
    }
}

/// Terminal state of a drag at pointer release.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Gesture {
    /// Horizontal offset from the resting position (px).
    pub dx: f64,
    /// Horizontal velocity at release (px/s).
    pub vx: f64,
}

impl Gesture {
    pub fn new(dx: f64, vx: f64) -> Self {
        Self { dx, vx }
    }
}

/// Result of classifying a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Swipe {
    /// Apply to the job.
    Right,
    /// Pass on the job.
    Left,
    /// Spring back; nothing is recorded.
    None,
}

impl Swipe {
    /// Whether this swipe is recorded as an application.
    pub fn applied(self) -> Option<bool> {
        match self {
            Swipe::Right => Some(true),
            Swipe::Left => Some(false),
            Swipe::None => None,
        }
    }

    /// Label shown while the card settles.
    pub fn status_label(self) -> Option<&'static str> {
        match self {
            Swipe::Right => Some("Applied"),
            Swipe::Left => Some("Rejected"),
            Swipe::None => None,
        }
    }
}

/// Classify a release into a swipe direction.
///
/// A direction fires when either its offset or its velocity threshold is
/// crossed. If both directions fire (a drag one way flicked hard the other
/// way) the offset decides. NaN inputs never cross a threshold.
pub fn classify(gesture: Gesture, thresholds: &SwipeThresholds) -> Swipe {
    let Gesture { dx, vx } = gesture;

    let right = dx > thresholds.distance || vx > thresholds.velocity;
    let left = dx < -thresholds.distance || vx < -thresholds.velocity;

    match (right, left) {
        (true, false) => Swipe::Right,
        (false, true) => Swipe::Left,
        (false, false) => Swipe::None,
        // One side must have come from the offset.
        (true, true) if dx > thresholds.distance => Swipe::Right,
        (true, true) => Swipe::Left,
    }
}
