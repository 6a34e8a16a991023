//! Data models for the JobSwipe application.
//!
//! Field names serialize as camelCase to match the web client.

mod decision;
mod job;
mod revision;

pub use decision::*;
pub use job::*;
pub use revision::*;
