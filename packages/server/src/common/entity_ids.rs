//! Typed IDs for domain entities.

pub use super::id::Id;

/// Marker type for title-improvement jobs.
pub struct Job;

/// Identifier of one submitted job.
pub type JobId = Id<Job>;
