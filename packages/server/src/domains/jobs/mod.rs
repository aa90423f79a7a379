//! Jobs domain: the per-request record and where it is kept.

pub mod models;
pub mod pg_store;
pub mod store;

pub use models::{ImprovedItem, Job, JobPatch, JobStatus, MergeOutcome};
pub use pg_store::PostgresJobStore;
pub use store::{InMemoryJobStore, JobStore, Revision, MAX_MERGE_ATTEMPTS};
