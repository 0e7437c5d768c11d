//! Health check endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use core_config::AppInfo;
use domain_events::{Backend, EventQuery, EventRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    fn new(status: &str, app: &AppInfo) -> Self {
        Self {
            status: status.to_string(),
            service: app.name.to_string(),
            version: app.version.to_string(),
        }
    }
}

struct HealthState<B> {
    app: AppInfo,
    backend: Arc<B>,
}

async fn health<B: Backend>(State(state): State<Arc<HealthState<B>>>) -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy", &state.app))
}

/// Ready once the backend answers a one-row select
async fn ready<B: Backend>(
    State(state): State<Arc<HealthState<B>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.backend.select(&EventQuery::new().limit(1)).await {
        Ok(_) => (StatusCode::OK, Json(HealthResponse::new("ready", &state.app))),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new("unavailable", &state.app)),
            )
        }
    }
}

pub fn router<B: Backend>(app: AppInfo, backend: Arc<B>) -> Router {
    Router::new()
        .route("/health", get(health::<B>))
        .route("/ready", get(ready::<B>))
        .with_state(Arc::new(HealthState { app, backend }))
}
