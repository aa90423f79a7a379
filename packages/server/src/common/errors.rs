//! Error taxonomy shared by the job store, the adapters and the pipeline.

use thiserror::Error;

use super::entity_ids::JobId;

/// Failure reported by an external service adapter.
///
/// Adapters never panic or leak client-specific error types; everything is
/// folded into one of these before it reaches a stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// A credential or setting the adapter needs is missing.
    #[error("{0}")]
    Configuration(String),

    /// The remote call failed (network, non-2xx status).
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The remote call succeeded but the result cannot be used.
    #[error("{service} returned an unusable result: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    /// Nothing to work with (no matching channel, no uploads).
    #[error("{0}")]
    EmptyResult(String),
}

impl AdapterError {
    pub fn transport(service: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            service,
            message: message.into(),
        }
    }

    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

/// Job store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {0} already exists")]
    AlreadyExists(JobId),

    /// Optimistic concurrency check failed (someone else wrote first).
    #[error("concurrent update to job {job_id} (after {attempts} attempt(s))")]
    Conflict { job_id: JobId, attempts: u32 },

    #[error("job store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// Error surfaced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credential; aborts the stage that needed it.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad inbound input; only ever returned to the submitter.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Adapter(AdapterError),

    /// Job record missing when a stage tried to load it.
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error(transparent)]
    Store(StoreError),

    /// The event engine refused the emission (runtime stopped).
    #[error("event dispatch failed: {0}")]
    Dispatch(#[from] seesaw::SeesawError),
}

impl From<AdapterError> for PipelineError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Configuration(message) => Self::Configuration(message),
            other => Self::Adapter(other),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(job_id) => Self::NotFound(job_id),
            other => Self::Store(other),
        }
    }
}
