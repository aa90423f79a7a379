use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::common::{JobId, StoreError};
use crate::domains::jobs::Job;
use crate::server::app::AppState;
use crate::server::routes::submit::ErrorResponse;

/// Read-only job status lookup
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, (StatusCode, Json<ErrorResponse>)> {
    let job_id: JobId = job_id.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid job id".to_string(),
            }),
        )
    })?;

    match state.jobs.get(job_id).await {
        Ok(job) => Ok(Json(job)),
        Err(StoreError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Job not found".to_string(),
            }),
        )),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Job lookup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal Server Error".to_string(),
                }),
            ))
        }
    }
}
