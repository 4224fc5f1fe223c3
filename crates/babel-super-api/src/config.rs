//! Process configuration from flags and environment variables.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use babel_http_server::{ApiInfo, CorsConfig, ServerConfig};
use babel_session_storage::password::MIN_PASSWORD_LENGTH;

/// Minimum length of the password hashing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Ten years
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BABEL_AUTH_SECRET must be at least {} characters", MIN_SECRET_LENGTH)]
    SecretTooShort,
    #[error("BABEL_ADMIN_EMAIL and BABEL_ADMIN_PASSWORD must be set together")]
    IncompleteAdminCredentials,
    #[error("BABEL_ADMIN_PASSWORD must be at least {} characters", MIN_PASSWORD_LENGTH)]
    AdminPasswordTooShort,
    #[error("SESSION_TTL_HOURS must not exceed {}", MAX_SESSION_TTL_HOURS)]
    SessionTtlTooLong,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Cannot resolve bind address {0}")]
    InvalidBindAddress(String),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "babel-super-api")]
#[command(version, about = "Babel Panel super-admin JSON-RPC API")]
pub struct AppConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "HOSTNAME", default_value = "0.0.0.0")]
    pub hostname: String,

    /// Deployment environment; falls back to NODE_ENV, then "development"
    #[arg(long = "env", env = "APP_ENV")]
    pub environment: Option<String>,

    /// Argon2 secret used when hashing passwords
    #[arg(long, env = "BABEL_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: String,

    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3001")]
    pub cors_origin: String,

    /// Preflight cache lifetime in seconds
    #[arg(long, env = "CORS_MAX_AGE", default_value_t = 600)]
    pub cors_max_age: u64,

    /// Default filter directive when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 168)]
    pub session_ttl_hours: u64,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Maximum request body in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = 1024 * 1024)]
    pub max_body_size: usize,

    /// Admin account created at startup when missing
    #[arg(long, env = "BABEL_ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "BABEL_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort);
        }
        match (&self.admin_email, &self.admin_password) {
            (Some(_), Some(password)) if password.chars().count() < MIN_PASSWORD_LENGTH => {
                return Err(ConfigError::AdminPasswordTooShort);
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::IncompleteAdminCredentials);
            }
            _ => {}
        }
        if self.session_ttl_hours == 0 {
            return Err(ConfigError::Zero("SESSION_TTL_HOURS"));
        }
        if self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::SessionTtlTooLong);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("REQUEST_TIMEOUT_SECS"));
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Zero("MAX_BODY_SIZE"));
        }
        Ok(())
    }

    pub fn environment(&self) -> String {
        self.environment
            .clone()
            .or_else(|| std::env::var("NODE_ENV").ok())
            .filter(|env| !env.trim().is_empty())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = || ConfigError::InvalidBindAddress(format!("{}:{}", self.hostname, self.port));
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.min(MAX_SESSION_TTL_HOURS) as i64)
    }

    /// Transport settings derived from this configuration
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        Ok(ServerConfig {
            bind_address: self.bind_address()?,
            rpc_path: "/json-rpc".to_string(),
            max_body_size: self.max_body_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            cors: Some(CorsConfig {
                origin: self.cors_origin.clone(),
                max_age_secs: self.cors_max_age,
            }),
            environment: self.environment(),
            api: ApiInfo {
                name: "Babel Panel API".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: "Super-admin JSON-RPC API for the Babel Panel platform".to_string(),
            },
        })
    }
}
