//! API routes module

pub mod health;

use axum::Router;
use core_config::AppInfo;
use domain_events::{Backend, events_router};
use std::sync::Arc;

/// Events API under `/api` plus the health probes at the root
pub fn routes<B: Backend>(app: AppInfo, backend: Arc<B>) -> Router {
    Router::new()
        .nest("/api", events_router(Arc::clone(&backend)))
        .merge(health::router(app, backend))
}
