use async_trait::async_trait;

use super::executor::{Stage, Trigger};
use crate::common::{AdapterError, JobId, PipelineError};
use crate::domains::jobs::{Job, JobPatch, JobStatus};
use crate::domains::pipeline::events::{topics, PipelineEvent, StageFailure};
use crate::kernel::{ContentItem, ServerDeps};

pub struct ListInput {
    pub resolved_id: String,
    pub resolved_name: String,
}

pub struct Listing {
    pub resolved_name: String,
    pub items: Vec<ContentItem>,
}

/// `resolved` → fetch the channel's most recent uploads.
///
/// A channel without uploads fails the job here rather than sending an
/// empty list downstream.
pub struct ListStage;

#[async_trait]
impl Stage for ListStage {
    type Input = ListInput;
    type Output = Listing;

    fn name(&self) -> &'static str {
        "list"
    }

    fn trigger_topic(&self) -> &'static str {
        topics::RESOLVED
    }

    fn in_progress(&self) -> JobStatus {
        JobStatus::Listing
    }

    fn accept(&self, event: PipelineEvent) -> Option<Trigger<ListInput>> {
        match event {
            PipelineEvent::Resolved {
                job_id,
                contact_address,
                resolved_id,
                resolved_name,
            } => Some(Trigger {
                job_id,
                contact_address,
                input: ListInput {
                    resolved_id,
                    resolved_name,
                },
            }),
            _ => None,
        }
    }

    fn is_recorded(&self, job: &Job) -> bool {
        job.items.is_some()
    }

    async fn run(
        &self,
        deps: &ServerDeps,
        _contact_address: &str,
        input: ListInput,
    ) -> Result<Listing, PipelineError> {
        let items = deps
            .content_lister
            .list(&input.resolved_id, deps.max_items)
            .await?;

        if items.is_empty() {
            return Err(AdapterError::EmptyResult(format!(
                "Channel \"{}\" has no videos",
                input.resolved_name
            ))
            .into());
        }

        Ok(Listing {
            resolved_name: input.resolved_name,
            items,
        })
    }

    fn succeeded(
        &self,
        job_id: JobId,
        contact_address: String,
        listing: Listing,
    ) -> (JobPatch, PipelineEvent) {
        let patch = JobPatch::status(JobStatus::Improving).items(listing.items.clone());
        let event = PipelineEvent::Listed {
            job_id,
            contact_address,
            resolved_name: listing.resolved_name,
            items: listing.items,
        };
        (patch, event)
    }

    fn failed(&self, failure: StageFailure) -> PipelineEvent {
        PipelineEvent::ListFailed(failure)
    }
}
