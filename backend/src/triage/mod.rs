//! Swipe triage engine.
//!
//! A release is classified into a swipe, the decision is written, and after a
//! short settle delay the session's cursor moves to the next job.

mod classifier;
mod feed;
mod ports;
mod registry;
mod session;

pub use classifier::*;
pub use feed::*;
pub use ports::*;
pub use registry::*;
pub use session::*;
