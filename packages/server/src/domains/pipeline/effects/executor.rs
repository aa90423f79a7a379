//! Generic stage executor.
//!
//! Every pipeline stage follows the same contract, so the control flow lives
//! here once and each stage only supplies its own pieces through [`Stage`]:
//!
//! ```text
//! trigger event
//!   → load job                       (missing → failure event)
//!   → terminal / already past stage? (→ short-circuit, nothing emitted)
//!   → merge "<stage> in progress"
//!   → Stage::run                     (one adapter call)
//!       Ok  → merge outputs + next status → success event
//!                                         (store error: logged, event still sent)
//!       Err → merge failed + error        → failure event
//! ```
//!
//! Apart from the short-circuit, one invocation emits exactly one event,
//! whatever the adapter does.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use seesaw::{Effect, EffectContext};
use tracing::{error, info, warn};

use crate::common::{JobId, PipelineError};
use crate::domains::jobs::{Job, JobPatch, JobStatus, MergeOutcome};
use crate::domains::pipeline::events::{PipelineEvent, StageFailure};
use crate::kernel::ServerDeps;

/// What a stage needs from its triggering event.
#[derive(Debug, Clone)]
pub struct Trigger<I> {
    pub job_id: JobId,
    pub contact_address: String,
    pub input: I,
}

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    /// Topic that starts this stage.
    fn trigger_topic(&self) -> &'static str;

    /// Status recorded while the stage runs.
    fn in_progress(&self) -> JobStatus;

    /// Extract the stage input; `None` for events the stage does not handle.
    fn accept(&self, event: PipelineEvent) -> Option<Trigger<Self::Input>>;

    /// Whether this stage's output is already on the job.
    fn is_recorded(&self, job: &Job) -> bool;

    async fn run(
        &self,
        deps: &ServerDeps,
        contact_address: &str,
        input: Self::Input,
    ) -> Result<Self::Output, PipelineError>;

    /// Job update and event for a successful run.
    fn succeeded(
        &self,
        job_id: JobId,
        contact_address: String,
        output: Self::Output,
    ) -> (JobPatch, PipelineEvent);

    /// Wrap a failure in this stage's failure event.
    fn failed(&self, failure: StageFailure) -> PipelineEvent;
}

/// Adapts a [`Stage`] into a seesaw effect.
pub struct StageExecutor<S> {
    stage: S,
}

impl<S: Stage> StageExecutor<S> {
    pub fn new(stage: S) -> Self {
        Self { stage }
    }

    /// Why the stage must not run for `job`, if anything.
    fn skip_reason(&self, job: &Job) -> Option<&'static str> {
        if job.status.is_terminal() {
            Some("job already finished")
        } else if job.status.rank() > self.stage.in_progress().rank() {
            Some("job already past this stage")
        } else if self.stage.is_recorded(job) {
            Some("stage output already recorded")
        } else {
            None
        }
    }

    /// Persist the failure, then build the failure event.
    async fn fail(
        &self,
        deps: &ServerDeps,
        job_id: JobId,
        contact_address: String,
        err: PipelineError,
    ) -> PipelineEvent {
        let message = err.to_string();
        error!(
            job_id = %job_id,
            stage = self.stage.name(),
            error = %message,
            "Stage failed"
        );

        if !matches!(err, PipelineError::NotFound(_)) {
            if let Err(store_err) = deps.jobs.merge(job_id, JobPatch::failed(&message)).await {
                error!(
                    job_id = %job_id,
                    stage = self.stage.name(),
                    error = %store_err,
                    "Could not record job failure"
                );
            }
        }

        self.stage
            .failed(StageFailure::new(job_id, contact_address, message))
    }

    async fn execute(&self, deps: &ServerDeps, trigger: Trigger<S::Input>) -> Option<PipelineEvent> {
        let Trigger {
            job_id,
            contact_address,
            input,
        } = trigger;
        let stage = self.stage.name();

        let job = match deps.jobs.load(job_id).await {
            Ok(Some((job, _))) => job,
            Ok(None) => {
                warn!(job_id = %job_id, stage, "Job not found");
                let err = PipelineError::NotFound(job_id);
                return Some(self.fail(deps, job_id, contact_address, err).await);
            }
            Err(e) => return Some(self.fail(deps, job_id, contact_address, e.into()).await),
        };

        if let Some(reason) = self.skip_reason(&job) {
            if job.status.is_terminal() {
                warn!(job_id = %job_id, stage, status = %job.status, "Event for finished job ignored");
            } else {
                info!(job_id = %job_id, stage, status = %job.status, reason, "Skipping redelivered event");
            }
            return None;
        }

        match deps
            .jobs
            .merge(job_id, JobPatch::status(self.stage.in_progress()))
            .await
        {
            Ok(MergeOutcome::Terminal(_)) => {
                warn!(job_id = %job_id, stage, "Job finished concurrently, stage not started");
                return None;
            }
            Ok(_) => {}
            Err(e) => return Some(self.fail(deps, job_id, contact_address, e.into()).await),
        }

        info!(job_id = %job_id, stage, "Stage started");
        let started = Instant::now();

        let output = match self.stage.run(deps, &contact_address, input).await {
            Ok(output) => output,
            Err(err) => return Some(self.fail(deps, job_id, contact_address, err).await),
        };

        let (patch, event) = self
            .stage
            .succeeded(job_id, contact_address.clone(), output);

        match deps.jobs.merge(job_id, patch).await {
            Ok(MergeOutcome::Terminal(_)) => {
                warn!(job_id = %job_id, stage, "Job finished concurrently, result dropped");
                None
            }
            Ok(_) => {
                info!(
                    job_id = %job_id,
                    stage,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                Some(event)
            }
            Err(e) => {
                // The adapter call already went out, so the stage still succeeded.
                error!(
                    job_id = %job_id,
                    stage,
                    error = %e,
                    "Could not record stage result"
                );
                Some(event)
            }
        }
    }
}

#[async_trait]
impl<S: Stage> Effect<PipelineEvent, ServerDeps> for StageExecutor<S> {
    fn topics(&self) -> Vec<&'static str> {
        vec![self.stage.trigger_topic()]
    }

    fn name(&self) -> &'static str {
        self.stage.name()
    }

    async fn handle(
        &self,
        event: PipelineEvent,
        ctx: EffectContext<ServerDeps>,
    ) -> Result<Option<PipelineEvent>> {
        let Some(trigger) = self.stage.accept(event) else {
            return Ok(None);
        };
        Ok(self.execute(ctx.deps(), trigger).await)
    }
}
