//! Axum middleware for per-route HTTP request metrics.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};
use metrics::{counter, histogram};
use std::time::Instant;

/// Paths that are never recorded (scrapes and probes would drown real traffic).
const IGNORED_PATHS: &[&str] = &["/metrics", "/health"];

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Records `http_requests_total`, `http_request_duration_seconds` and
/// `http_requests_errors_total`, labelled by the matched route template so
/// that `/admin/events/{id}/approve` is one series, not one per id.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn(metrics_middleware));
/// ```
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if IGNORED_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status();
    let code = status.as_u16();

    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => code.to_string(),
        "status_class" => status_class(code)
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(elapsed);

    if status.is_client_error() || status.is_server_error() {
        counter!(
            "http_requests_errors_total",
            "method" => method,
            "path" => path,
            "status" => code.to_string()
        )
        .increment(1);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(204), "2xx");
        assert_eq!(status_class(403), "4xx");
        assert_eq!(status_class(502), "5xx");
        assert_eq!(status_class(101), "other");
    }

    #[tokio::test]
    async fn test_middleware_passes_response_through() {
        let app = Router::new()
            .route("/events/upcoming", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(metrics_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/events/upcoming")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
