use async_trait::async_trait;

use super::executor::{Stage, Trigger};
use crate::common::{AdapterError, JobId, PipelineError};
use crate::domains::jobs::{Job, JobPatch, JobStatus};
use crate::domains::pipeline::events::{topics, PipelineEvent, StageFailure};
use crate::kernel::{ResolvedIdentity, ServerDeps};

/// `submitted` → find the channel the user named.
pub struct ResolveStage;

#[async_trait]
impl Stage for ResolveStage {
    type Input = String;
    type Output = ResolvedIdentity;

    fn name(&self) -> &'static str {
        "resolve"
    }

    fn trigger_topic(&self) -> &'static str {
        topics::SUBMITTED
    }

    fn in_progress(&self) -> JobStatus {
        JobStatus::Resolving
    }

    fn accept(&self, event: PipelineEvent) -> Option<Trigger<String>> {
        match event {
            PipelineEvent::Submitted {
                job_id,
                subject_query,
                contact_address,
            } => Some(Trigger {
                job_id,
                contact_address,
                input: subject_query,
            }),
            _ => None,
        }
    }

    fn is_recorded(&self, job: &Job) -> bool {
        job.resolved_id.is_some()
    }

    async fn run(
        &self,
        deps: &ServerDeps,
        _contact_address: &str,
        query: String,
    ) -> Result<ResolvedIdentity, PipelineError> {
        deps.identity_resolver
            .resolve(&query)
            .await?
            .ok_or_else(|| AdapterError::EmptyResult(format!("No channel found for \"{query}\"")).into())
    }

    fn succeeded(
        &self,
        job_id: JobId,
        contact_address: String,
        identity: ResolvedIdentity,
    ) -> (JobPatch, PipelineEvent) {
        let patch = JobPatch::status(JobStatus::Listing)
            .resolved(identity.id.clone(), identity.display_name.clone());
        let event = PipelineEvent::Resolved {
            job_id,
            contact_address,
            resolved_id: identity.id,
            resolved_name: identity.display_name,
        };
        (patch, event)
    }

    fn failed(&self, failure: StageFailure) -> PipelineEvent {
        PipelineEvent::ResolveFailed(failure)
    }
}
