//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domains::jobs::JobStore;
use crate::domains::pipeline::PipelineHandle;
use crate::server::routes::{get_job_handler, health_handler, submit_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(pipeline: PipelineHandle, jobs: Arc<dyn JobStore>) -> Self {
        Self { pipeline, jobs }
    }
}

/// CORS layer for the configured origins; `None` when no origin is allowed.
fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE]),
    )
}

/// Build the axum application
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/submit", post(submit_handler))
        .route("/jobs/:job_id", get(get_job_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state));

    if let Some(cors) = cors_layer(allowed_origins) {
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_origins_means_no_cors() {
        assert!(cors_layer(&[]).is_none());
    }

    #[test]
    fn valid_origins_build_a_layer() {
        let origins = vec!["http://localhost:3000".to_string()];
        assert!(cors_layer(&origins).is_some());
    }
}
