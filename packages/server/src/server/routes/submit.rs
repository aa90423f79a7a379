use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::common::{JobId, PipelineError};
use crate::domains::pipeline::{submit_job, SubmitJobInput};
use crate::server::app::AppState;

pub const QUEUED_MESSAGE: &str =
    "Your request has been queued. You will receive an email once processing is complete.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub job_id: JobId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

type SubmitResult = Result<(StatusCode, Json<SubmitResponse>), (StatusCode, Json<ErrorResponse>)>;

/// Submission entry point
///
/// Validates the request, records the job and starts the pipeline. Returns
/// 202 as soon as the job is queued; the report arrives by email.
pub async fn submit_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<SubmitJobInput>, JsonRejection>,
) -> SubmitResult {
    let Json(input) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected submission body");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })?;

    match submit_job(input, state.jobs.as_ref(), &state.pipeline).await {
        Ok(job) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                success: true,
                job_id: job.id,
                message: QUEUED_MESSAGE.to_string(),
            }),
        )),
        Err(PipelineError::Validation(message)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))))
        }
        Err(e) => {
            error!(error = %e, "Error in submission handler");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal Server Error")),
            ))
        }
    }
}
