//! Babel Panel super-admin API server
//!
//! ```bash
//! BABEL_AUTH_SECRET=... cargo run -p babel-super-api -- --port 3000
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use babel_session_storage::{InMemoryStorage, PasswordHasher};
use babel_super_api::{AppConfig, build_server, logging, seed_admin, start_session_cleanup};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();
    config.validate().context("invalid configuration")?;
    logging::init(&config.log_level, config.log_format)?;

    info!(
        environment = %config.environment(),
        port = config.port,
        "Starting Babel Panel API"
    );

    let storage = Arc::new(InMemoryStorage::new());

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let hasher = PasswordHasher::new(config.auth_secret.clone());
        seed_admin(storage.as_ref(), &hasher, email, password)
            .await
            .context("failed to seed admin account")?;
    }

    let server = build_server(&config, storage.clone())?;
    let cleanup = start_session_cleanup(storage, SESSION_CLEANUP_INTERVAL);

    server.run(shutdown_signal()).await?;

    cleanup.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
