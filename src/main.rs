//! lighthouse-core server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use lighthouse_core::config::LighthouseConfig;
use lighthouse_core::server::{build_app, build_state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = LighthouseConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        topic_prefix = %config.topic_prefix,
        seed = ?config.seed_file,
        "starting lighthouse-core"
    );

    // Build service graph and router
    let state = build_state(&config).await?;
    let domain_service = std::sync::Arc::clone(&state.domain_service);
    let app = build_app(state, Duration::from_secs(config.request_timeout_secs));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    domain_service.close_all();
    Ok(())
}
