use async_trait::async_trait;

use super::executor::{Stage, Trigger};
use crate::common::{AdapterError, JobId, PipelineError};
use crate::domains::jobs::{ImprovedItem, Job, JobPatch, JobStatus};
use crate::domains::pipeline::events::{topics, PipelineEvent, StageFailure};
use crate::kernel::{ContentItem, ServerDeps, TitleSuggestion};

pub struct ImproveInput {
    pub resolved_name: String,
    pub items: Vec<ContentItem>,
}

pub struct Improvement {
    pub resolved_name: String,
    pub improved_items: Vec<ImprovedItem>,
}

/// `listed` → ask the text improver for better titles.
pub struct ImproveStage;

/// Pair each suggestion with the item it was made for.
pub fn align(
    items: &[ContentItem],
    suggestions: Vec<TitleSuggestion>,
) -> Result<Vec<ImprovedItem>, AdapterError> {
    if suggestions.len() != items.len() {
        return Err(AdapterError::invalid_response(
            "text improver",
            format!(
                "{} suggestions for {} titles",
                suggestions.len(),
                items.len()
            ),
        ));
    }

    Ok(items
        .iter()
        .zip(suggestions)
        .map(|(item, suggestion)| ImprovedItem {
            original: item.title.clone(),
            improved: suggestion.improved,
            rationale: suggestion.rationale,
            url: item.url.clone(),
        })
        .collect())
}

#[async_trait]
impl Stage for ImproveStage {
    type Input = ImproveInput;
    type Output = Improvement;

    fn name(&self) -> &'static str {
        "improve"
    }

    fn trigger_topic(&self) -> &'static str {
        topics::LISTED
    }

    fn in_progress(&self) -> JobStatus {
        JobStatus::Improving
    }

    fn accept(&self, event: PipelineEvent) -> Option<Trigger<ImproveInput>> {
        match event {
            PipelineEvent::Listed {
                job_id,
                contact_address,
                resolved_name,
                items,
            } => Some(Trigger {
                job_id,
                contact_address,
                input: ImproveInput {
                    resolved_name,
                    items,
                },
            }),
            _ => None,
        }
    }

    fn is_recorded(&self, job: &Job) -> bool {
        job.improved_items.is_some()
    }

    async fn run(
        &self,
        deps: &ServerDeps,
        _contact_address: &str,
        input: ImproveInput,
    ) -> Result<Improvement, PipelineError> {
        let titles: Vec<String> = input.items.iter().map(|i| i.title.clone()).collect();
        let suggestions = deps
            .text_improver
            .improve(&input.resolved_name, &titles)
            .await?;

        Ok(Improvement {
            improved_items: align(&input.items, suggestions)?,
            resolved_name: input.resolved_name,
        })
    }

    fn succeeded(
        &self,
        job_id: JobId,
        contact_address: String,
        improvement: Improvement,
    ) -> (JobPatch, PipelineEvent) {
        let patch =
            JobPatch::status(JobStatus::Notifying).improved_items(improvement.improved_items.clone());
        let event = PipelineEvent::Improved {
            job_id,
            contact_address,
            resolved_name: improvement.resolved_name,
            improved_items: improvement.improved_items,
        };
        (patch, event)
    }

    fn failed(&self, failure: StageFailure) -> PipelineEvent {
        PipelineEvent::ImproveFailed(failure)
    }
}
