use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

const STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    job_store: JobStoreHealth,
}

#[derive(Debug, Serialize)]
pub struct JobStoreHealth {
    backend: &'static str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Returns 200 OK when the job store answers within five seconds, 503
/// Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.jobs.backend();

    let job_store = match tokio::time::timeout(STORE_TIMEOUT, state.jobs.ping()).await {
        Ok(Ok(())) => JobStoreHealth {
            backend,
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => JobStoreHealth {
            backend,
            status: "error".to_string(),
            error: Some(format!("Ping failed: {}", e)),
        },
        Err(_) => JobStoreHealth {
            backend,
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let is_healthy = job_store.status == "ok";

    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            job_store,
        }),
    )
}
