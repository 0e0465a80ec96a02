//! LogPilot - live log dashboard with chat-driven panel highlighting
//!
//! This binary polls aggregate log statistics from the backend, relays chat
//! questions to its answering service and serves the resulting dashboard.

use anyhow::{Context, Result};
use logpilot_core::{
    health::{components, HealthRegistry},
    ChatSession, DashboardControllerBuilder, HttpAnsweringClient, HttpStatsClient,
    StructuredLogger,
};
use logpilot_server::{api, config};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOGPILOT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting logpilot");

    let config = config::ServerConfig::load()?;
    let endpoints = config.endpoints();
    info!(
        instance = %config.instance,
        backend_url = %endpoints.base_url,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STATS_POLLER).await;
    health_registry.register(components::ANSWERING_SERVICE).await;

    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(LOGPILOT_VERSION, &endpoints.base_url);

    let stats = HttpStatsClient::new(&endpoints).context("Failed to create stats client")?;
    let answering =
        HttpAnsweringClient::new(&endpoints).context("Failed to create answering client")?;

    match answering.health().await {
        Ok(backend) => info!(status = %backend.status, "Backend reachable"),
        Err(e) => warn!(kind = e.kind(), error = %e, "Backend not reachable yet"),
    }

    let dashboard = Arc::new(
        DashboardControllerBuilder::new()
            .source(Arc::new(stats))
            .health(health_registry.clone())
            .config(config.dashboard())
            .build()?,
    );
    dashboard.start();

    let chat = Arc::new(
        ChatSession::new(Arc::new(answering))
            .with_listener(dashboard.clone())
            .with_health(health_registry.clone()),
    );

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        dashboard.clone(),
        chat,
    ));

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, async {
        let _ = stop_rx.await;
    }));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    dashboard.teardown();
    let _ = stop_tx.send(());

    match api_handle.await {
        Ok(Err(e)) => warn!(error = %e, "API server exited with error"),
        Err(e) => warn!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutting down");
    Ok(())
}
