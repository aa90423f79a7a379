use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::JobId;
use crate::kernel::ContentItem;

/// Progress of a job through the pipeline.
///
/// Variants are declared in pipeline order; `rank` exposes that order so
/// transitions can be checked for forward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Resolving,
    Listing,
    Improving,
    Notifying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Resolving => 1,
            JobStatus::Listing => 2,
            JobStatus::Improving => 3,
            JobStatus::Notifying => 4,
            JobStatus::Completed => 5,
            JobStatus::Failed => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Resolving => "resolving",
            JobStatus::Listing => "listing",
            JobStatus::Improving => "improving",
            JobStatus::Notifying => "notifying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listed item after improvement, linked back to its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovedItem {
    pub original: String,
    pub improved: String,
    pub rationale: String,
    pub url: String,
}

/// One user request and everything the pipeline learned while serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "jobId")]
    pub id: JobId,
    pub subject_query: String,
    pub contact_address: String,
    pub status: JobStatus,
    pub error: Option<String>,

    // Stage outputs, each written at most once
    pub resolved_id: Option<String>,
    pub resolved_name: Option<String>,
    pub items: Option<Vec<ContentItem>>,
    pub improved_items: Option<Vec<ImprovedItem>>,
    pub delivery_receipt_id: Option<String>,

    // Failure notice bookkeeping, written at most once even on finished jobs
    pub failure_notified_at: Option<DateTime<Utc>>,
    pub failure_notice_receipt_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly submitted job in `queued` state.
    pub fn new(subject_query: impl Into<String>, contact_address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            subject_query: subject_query.into(),
            contact_address: contact_address.into(),
            status: JobStatus::Queued,
            error: None,
            resolved_id: None,
            resolved_name: None,
            items: None,
            improved_items: None,
            delivery_receipt_id: None,
            failure_notified_at: None,
            failure_notice_receipt_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Merge `patch` into this record.
    ///
    /// - terminal jobs are never changed, except for recording the failure
    ///   notice
    /// - fields that are already set keep their value
    /// - status only moves forward, except that `failed` is reachable from any
    ///   non-terminal state
    /// - `error` is only recorded together with `failed`
    pub fn apply(&self, patch: &JobPatch) -> MergeOutcome {
        let mut next = self.clone();

        fill(&mut next.failure_notified_at, &patch.failure_notified_at);
        fill(&mut next.failure_notice_receipt_id, &patch.failure_notice_receipt_id);

        if self.status.is_terminal() {
            if next == *self {
                return MergeOutcome::Terminal(next);
            }
            next.updated_at = Utc::now();
            return MergeOutcome::Applied(next);
        }

        fill(&mut next.resolved_id, &patch.resolved_id);
        fill(&mut next.resolved_name, &patch.resolved_name);
        fill(&mut next.items, &patch.items);
        fill(&mut next.improved_items, &patch.improved_items);
        fill(&mut next.delivery_receipt_id, &patch.delivery_receipt_id);

        match patch.status {
            Some(JobStatus::Failed) => {
                next.status = JobStatus::Failed;
                next.error = Some(
                    patch
                        .error
                        .clone()
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| "unknown failure".to_string()),
                );
            }
            Some(status) if status.rank() > self.status.rank() => {
                next.status = status;
                if status == JobStatus::Completed {
                    next.completed_at = Some(patch.completed_at.unwrap_or_else(Utc::now));
                }
            }
            _ => {}
        }

        if next == *self {
            return MergeOutcome::Unchanged(next);
        }

        next.updated_at = Utc::now();
        MergeOutcome::Applied(next)
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

/// Partial update to a job. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub error: Option<String>,
    pub resolved_id: Option<String>,
    pub resolved_name: Option<String>,
    pub items: Option<Vec<ContentItem>>,
    pub improved_items: Option<Vec<ImprovedItem>>,
    pub delivery_receipt_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_notified_at: Option<DateTime<Utc>>,
    pub failure_notice_receipt_id: Option<String>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn resolved(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.resolved_id = Some(id.into());
        self.resolved_name = Some(name.into());
        self
    }

    pub fn items(mut self, items: Vec<ContentItem>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn improved_items(mut self, items: Vec<ImprovedItem>) -> Self {
        self.improved_items = Some(items);
        self
    }

    pub fn delivered(mut self, receipt_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.delivery_receipt_id = Some(receipt_id.into());
        self.completed_at = Some(at);
        self
    }

    /// Record that the failure notice went out. `receipt_id` is `None` when
    /// there was no address or the send failed.
    pub fn failure_notified(receipt_id: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            failure_notified_at: Some(at),
            failure_notice_receipt_id: receipt_id,
            ..Default::default()
        }
    }
}

/// Result of merging a patch into a job.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The record changed.
    Applied(Job),
    /// The patch carried nothing new.
    Unchanged(Job),
    /// The job had already finished; the patch was ignored.
    Terminal(Job),
}

impl MergeOutcome {
    pub fn job(&self) -> &Job {
        match self {
            MergeOutcome::Applied(job)
            | MergeOutcome::Unchanged(job)
            | MergeOutcome::Terminal(job) => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            MergeOutcome::Applied(job)
            | MergeOutcome::Unchanged(job)
            | MergeOutcome::Terminal(job) => job,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeOutcome::Terminal(_))
    }
}
