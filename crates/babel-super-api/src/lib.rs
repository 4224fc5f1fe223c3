//! # Babel Panel Super-Admin API
//!
//! Wires the JSON-RPC registry, the HTTP pipeline and the storage backends
//! into the super-admin service:
//!
//! - [`config`]: command line and environment configuration
//! - [`logging`]: tracing subscriber setup
//! - [`methods`]: method names and the access catalog
//! - [`services`]: auth, user and system handlers
//! - [`bootstrap`]: registry construction and admin seeding

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod methods;
pub mod services;

pub use bootstrap::{build_registry, build_server, seed_admin, start_session_cleanup};
pub use config::{AppConfig, ConfigError, LogFormat};
pub use services::ServiceContext;
