use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::executor::{Stage, Trigger};
use crate::common::{JobId, PipelineError};
use crate::domains::jobs::{ImprovedItem, Job, JobPatch, JobStatus};
use crate::domains::pipeline::events::{topics, PipelineEvent, StageFailure};
use crate::domains::pipeline::report;
use crate::kernel::{DeliveryReceipt, ServerDeps};

pub struct NotifyInput {
    pub resolved_name: String,
    pub improved_items: Vec<ImprovedItem>,
}

pub struct Delivery {
    pub receipt: DeliveryReceipt,
    pub delivered_at: DateTime<Utc>,
}

/// `improved` → email the report and complete the job.
pub struct NotifyStage;

#[async_trait]
impl Stage for NotifyStage {
    type Input = NotifyInput;
    type Output = Delivery;

    fn name(&self) -> &'static str {
        "notify"
    }

    fn trigger_topic(&self) -> &'static str {
        topics::IMPROVED
    }

    fn in_progress(&self) -> JobStatus {
        JobStatus::Notifying
    }

    fn accept(&self, event: PipelineEvent) -> Option<Trigger<NotifyInput>> {
        match event {
            PipelineEvent::Improved {
                job_id,
                contact_address,
                resolved_name,
                improved_items,
            } => Some(Trigger {
                job_id,
                contact_address,
                input: NotifyInput {
                    resolved_name,
                    improved_items,
                },
            }),
            _ => None,
        }
    }

    fn is_recorded(&self, job: &Job) -> bool {
        job.delivery_receipt_id.is_some()
    }

    async fn run(
        &self,
        deps: &ServerDeps,
        contact_address: &str,
        input: NotifyInput,
    ) -> Result<Delivery, PipelineError> {
        let subject = report::success_subject(&input.resolved_name);
        let body = report::success_body(&input.resolved_name, &input.improved_items);

        let receipt = deps.notifier.send(contact_address, &subject, &body).await?;
        Ok(Delivery {
            receipt,
            delivered_at: Utc::now(),
        })
    }

    fn succeeded(
        &self,
        job_id: JobId,
        contact_address: String,
        delivery: Delivery,
    ) -> (JobPatch, PipelineEvent) {
        let receipt_id = delivery.receipt.delivery_receipt_id;
        let patch = JobPatch::status(JobStatus::Completed)
            .delivered(receipt_id.clone(), delivery.delivered_at);
        let event = PipelineEvent::Done {
            job_id,
            contact_address,
            delivery_receipt_id: receipt_id,
        };
        (patch, event)
    }

    fn failed(&self, failure: StageFailure) -> PipelineEvent {
        PipelineEvent::NotifyFailed(failure)
    }
}
