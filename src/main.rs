// nim2claude - Anthropic Messages API proxy for OpenAI-compatible chat completions
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use nim2claude::cli::Args;
use nim2claude::config::AppConfig;
use nim2claude::server::create_router;
use nim2claude::upstream::UpstreamClient;
use nim2claude::utils::logging;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration, CLI flags win
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting nim2claude v{}", env!("CARGO_PKG_VERSION"));

    if config.upstream.api_key.is_empty() {
        warn!("No upstream API key configured; requests are sent without Authorization");
    }
    if config.auth.token.is_none() {
        info!("Client authentication disabled (no auth.token set)");
    }

    // Phase 3: Upstream client
    let upstream = UpstreamClient::new(&config.upstream)?;
    info!("Forwarding to {}", upstream.base_url());

    // Phase 4: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, upstream)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 5: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
