//! # nexus-server
//!
//! HTTP server for the nexus beacon-proximity attendance system.
//!
//! This binary provides:
//! - REST API for session lifecycle, proximity validation, and attendance
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package nexus-server
//!
//! # Production
//! NEXUS_ENV=production ./nexus-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

use std::net::SocketAddr;
use std::path::PathBuf;

use nexus_core::NexusConfig;
use tokio::net::TcpListener;
use tracing::info;

use nexus_server::{api, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("NEXUS_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    // Config comes first; the logging setup reads its level and file
    // directory from it.
    let config_path = match std::env::var("NEXUS_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => NexusConfig::default_path()?,
    };
    let config = NexusConfig::load_or_default(&config_path)?;

    logging::init(&config.log, is_production)?;

    info!("Starting nexus-server");
    info!(path = %config_path.display(), "configuration loaded");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState::from_config(config)?.into_shared();
    let app = api::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
