//! # JSON-RPC over HTTP
//!
//! HTTP transport for the Babel Panel admin API. A single `POST /json-rpc`
//! endpoint feeds every call through the dispatch pipeline:
//!
//! 1. **params**: envelope validation and params normalization
//! 2. **auth**: session resolution and per-method access checks
//! 3. **dispatch**: registry invocation under the request timeout
//!
//! The server also exposes discovery (`GET /json-rpc`), a health probe and
//! an API index, with CORS headers on every response.

pub mod cors;
pub mod dispatch;
pub mod handler;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod status;

#[cfg(test)]
mod tests;

// Re-export main types
pub use cors::CorsLayer;
pub use dispatch::RpcDispatcher;
pub use handler::RpcHttpHandler;
pub use protocol::{
    SESSION_COOKIE, extract_bearer_token, extract_client_info, extract_credentials,
    extract_session_cookie,
};
pub use server::{ApiInfo, CorsConfig, RpcHttpServer, RpcHttpServerBuilder, ServerConfig};
pub use status::http_status;

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
