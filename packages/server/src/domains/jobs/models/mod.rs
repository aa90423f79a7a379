pub mod job;

pub use job::{ImprovedItem, Job, JobPatch, JobStatus, MergeOutcome};
