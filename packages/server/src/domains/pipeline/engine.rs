//! Wiring of the pipeline effects onto a seesaw engine.

use anyhow::Result;
use async_trait::async_trait;
use seesaw::{Engine, EngineBuilder, EngineHandle, EventEnvelope, EventTap, SeesawError};
use tracing::{debug, error, info};

use super::effects::{
    ErrorNotifier, ImproveStage, ListStage, NotifyStage, ResolveStage, StageExecutor,
};
use super::events::PipelineEvent;
use crate::kernel::ServerDeps;

pub type PipelineEngine = Engine<PipelineEvent, ServerDeps>;
pub type PipelineHandle = EngineHandle<PipelineEvent>;

/// Logs every pipeline fact, and the end of each job's chain at info.
pub struct PipelineLogTap;

#[async_trait]
impl EventTap<PipelineEvent> for PipelineLogTap {
    async fn on_event(&self, envelope: &EventEnvelope<PipelineEvent>) -> Result<()> {
        let event = &envelope.payload;
        if event.is_terminal() {
            info!(
                job_id = %event.job_id(),
                topic = envelope.topic(),
                cid = %envelope.cid,
                "Job finished"
            );
        } else {
            debug!(
                job_id = %event.job_id(),
                topic = envelope.topic(),
                cid = %envelope.cid,
                "Pipeline event handled"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pipeline_log"
    }
}

/// Builder with every stage, the error notifier and the log tap registered.
///
/// Tests add their own taps before calling `build`.
pub fn pipeline_builder(deps: ServerDeps) -> EngineBuilder<PipelineEvent, ServerDeps> {
    Engine::builder(deps)
        .with_effect(StageExecutor::new(ResolveStage))
        .with_effect(StageExecutor::new(ListStage))
        .with_effect(StageExecutor::new(ImproveStage))
        .with_effect(StageExecutor::new(NotifyStage))
        .with_effect(ErrorNotifier)
        .with_event_tap(PipelineLogTap)
        .on_error(|err| error!(error = %err, "Pipeline effect failed"))
}

/// Build and start the pipeline on the current tokio runtime.
pub fn start_pipeline(deps: ServerDeps) -> Result<PipelineHandle, SeesawError> {
    let engine = pipeline_builder(deps).build()?;
    Ok(engine.start())
}
