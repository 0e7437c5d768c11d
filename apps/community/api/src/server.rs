//! Router assembly and the HTTP server loop

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use core_config::server::ServerConfig;
use domain_events::ErrorResponse;
use eyre::WrapErr;
use observability::{metrics_handler, metrics_middleware};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::ApiDoc;

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// CORS for the configured origins. No origins means same-origin only.
pub fn cors_layer(origins: &[String]) -> eyre::Result<CorsLayer> {
    let allowed = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .wrap_err_with(|| format!("Invalid CORS_ALLOWED_ORIGIN value: {}", origin))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    if allowed.is_empty() {
        info!("CORS disabled, serving same-origin only");
        return Ok(CorsLayer::new());
    }

    info!(origins = ?origins, "CORS configured");
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(CORS_MAX_AGE))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            code: 1004,
            error: "NOT_FOUND".to_string(),
            message: "The requested resource was not found".to_string(),
            details: None,
        }),
    )
}

/// Wrap the application routes with docs, `/metrics` and the middleware stack.
pub fn build_app(routes: Router, server: &ServerConfig) -> eyre::Result<Router> {
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes)
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors_layer(&server.cors_origins)?)
        .layer(CompressionLayer::new());

    Ok(router)
}

/// Serve until SIGINT or SIGTERM, then give in-flight requests up to
/// `shutdown_timeout` to finish.
pub async fn serve(app: Router, server: &ServerConfig) -> eyre::Result<()> {
    let listener = TcpListener::bind(server.address())
        .await
        .wrap_err_with(|| format!("Failed to bind {}", server.address()))?;
    info!("Server starting on {}", listener.local_addr()?);

    let (stopping_tx, mut stopping_rx) = watch::channel(false);
    let serve = async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                stopping_tx.send_replace(true);
            })
            .await
    };
    tokio::pin!(serve);

    let timeout = server.shutdown_timeout;
    let deadline = async move {
        if stopping_rx.wait_for(|stopping| *stopping).await.is_ok() {
            tokio::time::sleep(timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = &mut serve => {
            result.inspect_err(|e| error!("Server encountered an error: {:?}", e))?;
            info!("All connections drained");
        }
        _ = deadline => {
            warn!(?timeout, "Graceful shutdown timed out, dropping open connections");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
