//! Fan-in error notifier.
//!
//! Every `*-failed` topic lands here. The requester gets one generic notice
//! (internal error text is never mailed), then `error-notified` closes the
//! job's event chain. Nothing in here returns an error: there is no further
//! fallback channel, so problems are logged and the chain still ends.
//!
//! The notice is recorded on the job, so a redelivered failure event or a
//! stray one for a completed job sends nothing and emits nothing. Failures
//! for unknown jobs are still answered.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use seesaw::{Effect, EffectContext};
use tracing::{error, info, warn};

use crate::common::JobId;
use crate::domains::jobs::{JobPatch, JobStatus};
use crate::domains::pipeline::events::{topics, PipelineEvent};
use crate::domains::pipeline::report;
use crate::kernel::ServerDeps;

pub struct ErrorNotifier;

#[async_trait]
impl Effect<PipelineEvent, ServerDeps> for ErrorNotifier {
    fn topics(&self) -> Vec<&'static str> {
        topics::FAILURES.to_vec()
    }

    fn name(&self) -> &'static str {
        "error_notifier"
    }

    async fn handle(
        &self,
        event: PipelineEvent,
        ctx: EffectContext<ServerDeps>,
    ) -> Result<Option<PipelineEvent>> {
        let Some(failure) = event.failure() else {
            return Ok(None);
        };
        let job_id = failure.job_id;

        info!(job_id = %job_id, error = %failure.error, "Handling failure notification");

        let deps = ctx.deps();
        let known = match deps.jobs.load(job_id).await {
            Ok(Some((job, _))) => {
                if job.status == JobStatus::Completed {
                    warn!(job_id = %job_id, "Failure event for completed job ignored");
                    return Ok(None);
                }
                if job.failure_notified_at.is_some() {
                    warn!(job_id = %job_id, "Failure notice already sent, event ignored");
                    return Ok(None);
                }
                true
            }
            Ok(None) => {
                warn!(job_id = %job_id, "Failure for unknown job, notice not recorded");
                false
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Could not load job for failure notice");
                false
            }
        };

        let Some(address) = failure
            .contact_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        else {
            warn!(job_id = %job_id, "No contact address, failure notice not sent");
            if known {
                record_notice(deps, job_id, None).await;
            }
            return Ok(Some(PipelineEvent::ErrorNotified {
                job_id,
                contact_address: None,
                delivery_receipt_id: None,
            }));
        };

        let delivery_receipt_id = match deps
            .notifier
            .send(address, report::FAILURE_SUBJECT, report::FAILURE_BODY)
            .await
        {
            Ok(receipt) => {
                info!(
                    job_id = %job_id,
                    receipt_id = %receipt.delivery_receipt_id,
                    "Failure notice sent"
                );
                Some(receipt.delivery_receipt_id)
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to send failure notice");
                None
            }
        };

        if known {
            record_notice(deps, job_id, delivery_receipt_id.clone()).await;
        }

        Ok(Some(PipelineEvent::ErrorNotified {
            job_id,
            contact_address: Some(address.to_string()),
            delivery_receipt_id,
        }))
    }
}

async fn record_notice(deps: &ServerDeps, job_id: JobId, receipt_id: Option<String>) {
    if let Err(e) = deps
        .jobs
        .merge(job_id, JobPatch::failure_notified(receipt_id, Utc::now()))
        .await
    {
        error!(job_id = %job_id, error = %e, "Could not record failure notice");
    }
}
