use serde::{Deserialize, Serialize};

use crate::common::JobId;
use crate::domains::jobs::ImprovedItem;
use crate::kernel::ContentItem;

/// Topic names on the pipeline bus.
pub mod topics {
    pub const SUBMITTED: &str = "submitted";
    pub const RESOLVED: &str = "resolved";
    pub const RESOLVE_FAILED: &str = "resolve-failed";
    pub const LISTED: &str = "listed";
    pub const LIST_FAILED: &str = "list-failed";
    pub const IMPROVED: &str = "improved";
    pub const IMPROVE_FAILED: &str = "improve-failed";
    pub const NOTIFY_FAILED: &str = "notify-failed";
    pub const DONE: &str = "done";
    pub const ERROR_NOTIFIED: &str = "error-notified";

    /// Every topic the fan-in error notifier listens on.
    pub const FAILURES: [&str; 4] = [RESOLVE_FAILED, LIST_FAILED, IMPROVE_FAILED, NOTIFY_FAILED];
}

/// Payload shared by every `*-failed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub job_id: JobId,
    pub contact_address: Option<String>,
    pub error: String,
}

impl StageFailure {
    pub fn new(job_id: JobId, contact_address: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            contact_address: Some(contact_address.into()),
            error: error.into(),
        }
    }
}

/// Pipeline events
/// Following seesaw-rs pattern: Events are immutable facts
///
/// Every event is keyed by its job id, so one job's events are handled in
/// order while different jobs proceed in parallel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum PipelineEvent {
    /// A job was accepted at the entry point
    #[serde(rename_all = "camelCase")]
    Submitted {
        job_id: JobId,
        subject_query: String,
        contact_address: String,
    },

    #[serde(rename_all = "camelCase")]
    Resolved {
        job_id: JobId,
        contact_address: String,
        resolved_id: String,
        resolved_name: String,
    },
    ResolveFailed(StageFailure),

    #[serde(rename_all = "camelCase")]
    Listed {
        job_id: JobId,
        contact_address: String,
        resolved_name: String,
        items: Vec<ContentItem>,
    },
    ListFailed(StageFailure),

    #[serde(rename_all = "camelCase")]
    Improved {
        job_id: JobId,
        contact_address: String,
        resolved_name: String,
        improved_items: Vec<ImprovedItem>,
    },
    ImproveFailed(StageFailure),

    /// The success report could not be delivered
    NotifyFailed(StageFailure),

    /// Terminal: report delivered
    #[serde(rename_all = "camelCase")]
    Done {
        job_id: JobId,
        contact_address: String,
        delivery_receipt_id: String,
    },

    /// Terminal: failure path finished (receipt absent if the notice was not sent)
    #[serde(rename_all = "camelCase")]
    ErrorNotified {
        job_id: JobId,
        contact_address: Option<String>,
        delivery_receipt_id: Option<String>,
    },
}

impl PipelineEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            PipelineEvent::Submitted { job_id, .. }
            | PipelineEvent::Resolved { job_id, .. }
            | PipelineEvent::Listed { job_id, .. }
            | PipelineEvent::Improved { job_id, .. }
            | PipelineEvent::Done { job_id, .. }
            | PipelineEvent::ErrorNotified { job_id, .. } => *job_id,
            PipelineEvent::ResolveFailed(f)
            | PipelineEvent::ListFailed(f)
            | PipelineEvent::ImproveFailed(f)
            | PipelineEvent::NotifyFailed(f) => f.job_id,
        }
    }

    /// The failure payload, for `*-failed` events.
    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            PipelineEvent::ResolveFailed(f)
            | PipelineEvent::ListFailed(f)
            | PipelineEvent::ImproveFailed(f)
            | PipelineEvent::NotifyFailed(f) => Some(f),
            _ => None,
        }
    }

    /// `done` and `error-notified` end a job's event chain.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Done { .. } | PipelineEvent::ErrorNotified { .. }
        )
    }
}

impl seesaw::Event for PipelineEvent {
    fn topic(&self) -> &'static str {
        match self {
            PipelineEvent::Submitted { .. } => topics::SUBMITTED,
            PipelineEvent::Resolved { .. } => topics::RESOLVED,
            PipelineEvent::ResolveFailed(_) => topics::RESOLVE_FAILED,
            PipelineEvent::Listed { .. } => topics::LISTED,
            PipelineEvent::ListFailed(_) => topics::LIST_FAILED,
            PipelineEvent::Improved { .. } => topics::IMPROVED,
            PipelineEvent::ImproveFailed(_) => topics::IMPROVE_FAILED,
            PipelineEvent::NotifyFailed(_) => topics::NOTIFY_FAILED,
            PipelineEvent::Done { .. } => topics::DONE,
            PipelineEvent::ErrorNotified { .. } => topics::ERROR_NOTIFIED,
        }
    }

    fn key(&self) -> Option<String> {
        Some(self.job_id().to_string())
    }
}
