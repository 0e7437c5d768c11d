//! Observability utilities for the community events API.
//!
//! - Prometheus recorder installation and the `/metrics` handler
//! - Axum middleware recording per-route HTTP metrics
//! - [`EventMetrics`] counters for submissions, moderation and public fetches
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use observability::{init_metrics, metrics_handler, metrics_middleware};
//!
//! init_metrics();
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(middleware::from_fn(metrics_middleware));
//! ```

pub mod events;
pub mod middleware;

pub use events::EventMetrics;
pub use middleware::metrics_middleware;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once and return its handle.
///
/// Returns `None` if another global recorder was installed first; metrics
/// macros then go to that recorder instead.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            info!("Prometheus metrics recorder initialized");
            register_metric_descriptions();
            Ok::<_, metrics_exporter_prometheus::BuildError>(handle)
        })
        .map_err(|e| warn!(error = %e, "Failed to install Prometheus recorder"))
        .ok()
}

/// Get the metrics handle (None until [`init_metrics`] succeeds)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for the /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP requests answered with 4xx or 5xx"
    );

    describe_counter!(
        "event_submissions_total",
        "Event submissions by outcome (accepted, unauthenticated, rejected)"
    );
    describe_counter!(
        "event_moderation_actions_total",
        "Admin moderation actions by action and outcome"
    );
    describe_counter!(
        "event_fetches_total",
        "Public upcoming-event fetches by outcome"
    );
    describe_histogram!(
        "event_fetch_result_size",
        "Number of events returned by the public upcoming query"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_handler_before_init() {
        if get_metrics_handle().is_none() {
            let body = metrics_handler().await;
            assert!(body.starts_with('#'));
        }
    }
}
