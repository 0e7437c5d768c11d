use crate::{env_list, env_or_default, ConfigError, FromEnv};
use std::net::Ipv4Addr;
use std::time::Duration;

const DEFAULT_PORT: &str = "8080";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: &str = "30";

/// Server configuration for the HTTP API
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means same-origin only.
    pub cors_origins: Vec<String>,
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or_default(key, default)
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        })
}

impl FromEnv for ServerConfig {
    /// Reads from environment variables with defaults:
    /// - HOST: 0.0.0.0
    /// - PORT: 8080
    /// - CORS_ALLOWED_ORIGIN: comma-separated list, empty by default
    /// - SHUTDOWN_TIMEOUT_SECS: 30
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = parse_var("PORT", DEFAULT_PORT)?;
        let timeout_secs: u64 = parse_var("SHUTDOWN_TIMEOUT_SECS", DEFAULT_SHUTDOWN_TIMEOUT_SECS)?;

        Ok(Self {
            host,
            port,
            cors_origins: env_list("CORS_ALLOWED_ORIGIN"),
            shutdown_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
