//! Submission entry point: validate, record the job, start the pipeline.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};

use crate::common::PipelineError;
use crate::domains::jobs::{Job, JobPatch, JobStore};
use crate::domains::pipeline::engine::PipelineHandle;
use crate::domains::pipeline::events::PipelineEvent;

lazy_static! {
    // Something@something.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MISSING_FIELDS: &str = "Missing subjectQuery or contactAddress";
pub const INVALID_EMAIL: &str = "Invalid email format";

/// Raw submission body. `channel` / `email` are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobInput {
    #[serde(default, alias = "channel")]
    pub subject_query: Option<String>,
    #[serde(default, alias = "email")]
    pub contact_address: Option<String>,
}

/// A submission that passed validation (both fields trimmed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub subject_query: String,
    pub contact_address: String,
}

pub fn is_valid_email(address: &str) -> bool {
    EMAIL_REGEX.is_match(address)
}

impl SubmitJobInput {
    pub fn new(subject_query: impl Into<String>, contact_address: impl Into<String>) -> Self {
        Self {
            subject_query: Some(subject_query.into()),
            contact_address: Some(contact_address.into()),
        }
    }

    pub fn validate(self) -> Result<ValidSubmission, PipelineError> {
        let subject_query = non_blank(self.subject_query);
        let contact_address = non_blank(self.contact_address);

        let (Some(subject_query), Some(contact_address)) = (subject_query, contact_address) else {
            return Err(PipelineError::Validation(MISSING_FIELDS.to_string()));
        };
        if !is_valid_email(&contact_address) {
            return Err(PipelineError::Validation(INVALID_EMAIL.to_string()));
        }

        Ok(ValidSubmission {
            subject_query,
            contact_address,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create the job record and emit `submitted`.
///
/// Returns as soon as the event is queued; the pipeline runs in the
/// background. If the event cannot be queued the job is marked failed so it
/// does not sit in `queued` forever.
pub async fn submit_job(
    input: SubmitJobInput,
    jobs: &dyn JobStore,
    pipeline: &PipelineHandle,
) -> Result<Job, PipelineError> {
    let submission = input.validate()?;
    let job = Job::new(submission.subject_query, submission.contact_address);

    jobs.create(&job).await?;
    info!(
        job_id = %job.id,
        subject_query = %job.subject_query,
        "Job created"
    );

    let event = PipelineEvent::Submitted {
        job_id: job.id,
        subject_query: job.subject_query.clone(),
        contact_address: job.contact_address.clone(),
    };

    if let Err(e) = pipeline.emit(event) {
        error!(job_id = %job.id, error = %e, "Could not start pipeline");
        if let Err(store_err) = jobs.merge(job.id, JobPatch::failed(e.to_string())).await {
            error!(job_id = %job.id, error = %store_err, "Could not record job failure");
        }
        return Err(e.into());
    }

    Ok(job)
}
