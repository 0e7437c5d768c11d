//! Configuration for the Community Events API

use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_flag, env_or_default, env_required,
    server::ServerConfig,
};
use std::fmt;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            backend: BackendConfig::from_env()?,
        })
    }
}

/// Email and password of a user registered at startup
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Which store serves events, admins and sessions
#[derive(Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Process-local store, lost on restart
    Memory {
        seed_demo: bool,
        /// Registered and granted admin on startup
        admin: Option<Credentials>,
    },
    /// Hosted Supabase project
    Supabase { url: String, key: String },
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Memory { seed_demo, admin } => f
                .debug_struct("Memory")
                .field("seed_demo", seed_demo)
                .field("admin", admin)
                .finish(),
            BackendConfig::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Memory { .. } => write!(f, "memory"),
            BackendConfig::Supabase { .. } => write!(f, "supabase"),
        }
    }
}

impl FromEnv for BackendConfig {
    /// Reads from environment variables:
    /// - EVENTS_BACKEND: `memory` (default) or `supabase`
    /// - SUPABASE_URL, SUPABASE_KEY: required for `supabase`
    /// - EVENTS_SEED_DEMO: seed demo events into `memory` (default false)
    /// - EVENTS_ADMIN_EMAIL, EVENTS_ADMIN_PASSWORD: optional `memory` admin
    fn from_env() -> Result<Self, ConfigError> {
        let kind = env_or_default("EVENTS_BACKEND", "memory");

        match kind.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendConfig::Memory {
                seed_demo: env_flag("EVENTS_SEED_DEMO", false)?,
                admin: admin_credentials()?,
            }),
            "supabase" => Ok(BackendConfig::Supabase {
                url: env_required("SUPABASE_URL")?,
                key: env_required("SUPABASE_KEY")?,
            }),
            other => Err(ConfigError::ParseError {
                key: "EVENTS_BACKEND".to_string(),
                details: format!("expected 'memory' or 'supabase', got '{}'", other),
            }),
        }
    }
}

fn admin_credentials() -> Result<Option<Credentials>, ConfigError> {
    let email = env_or_default("EVENTS_ADMIN_EMAIL", "");
    if email.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(Credentials {
        email: email.trim().to_string(),
        password: env_required("EVENTS_ADMIN_PASSWORD")?,
    }))
}
