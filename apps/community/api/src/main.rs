//! Community Events API - REST server

use chrono::Utc;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_events::{InMemoryBackend, SupabaseClient, demo_events};
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod server;

use config::{BackendConfig, Config};

/// Build the in-memory backend, optionally seeded and with a startup admin
async fn memory_backend(
    seed_demo: bool,
    admin: Option<&config::Credentials>,
) -> InMemoryBackend {
    let backend = InMemoryBackend::new();

    if seed_demo {
        let events = demo_events(Utc::now());
        info!(count = events.len(), "Seeding demo events");
        backend.seed_all(events).await;
    }

    if let Some(admin) = admin {
        let user = backend.register_user(&admin.email, &admin.password).await;
        backend.grant_admin(user.id).await;
        info!(email = %admin.email, user_id = %user.id, "Registered startup admin");
    }

    backend
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    if observability::init_metrics().is_none() {
        warn!("Prometheus recorder not installed, /metrics will be empty");
    }

    info!(
        service = config.app.name,
        version = config.app.version,
        backend = %config.backend,
        "Starting Community Events API"
    );

    let routes = match &config.backend {
        BackendConfig::Memory { seed_demo, admin } => {
            let backend = memory_backend(*seed_demo, admin.as_ref()).await;
            api::routes(config.app, Arc::new(backend))
        }
        BackendConfig::Supabase { url, key } => {
            let client = SupabaseClient::new(url.as_str(), key.as_str());
            info!(?client, "Using Supabase backend");
            api::routes(config.app, Arc::new(client))
        }
    };

    let app = server::build_app(routes, &config.server)?;
    server::serve(app, &config.server).await?;

    info!("Community Events API shutdown complete");
    Ok(())
}
