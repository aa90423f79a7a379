//! Title-improvement pipeline: one job flows through resolve, list, improve
//! and notify stages, with every failure converging on a single notifier.

pub mod actions;
pub mod effects;
pub mod engine;
pub mod events;
pub mod report;

pub use actions::{submit_job, SubmitJobInput};
pub use engine::{pipeline_builder, start_pipeline, PipelineEngine, PipelineHandle, PipelineLogTap};
pub use events::{topics, PipelineEvent, StageFailure};
