//! diner-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use diner_gateway::app_state::AppState;
use diner_gateway::config::GatewayConfig;
use diner_gateway::persistence::{PostgresPersistence, spawn_event_recorder};
use diner_gateway::service::QueueService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting diner-gateway");

    let app_state = AppState::from_config(&config).context("failed to build state")?;

    if config.persistence_enabled {
        let persistence = PostgresPersistence::connect(&config)
            .await
            .context("database unavailable")?;
        let tokens = persistence
            .load_consumed_tokens()
            .await
            .context("failed to load redeemed codes")?;
        let restored = app_state
            .redemption_service
            .ledger()
            .mark_consumed(tokens)
            .await;
        tracing::info!(restored, "redeemed codes restored");
        spawn_event_recorder(persistence, app_state.event_bus.subscribe());
        tracing::info!("event recorder started");
    } else {
        tracing::info!("persistence disabled, state is in-memory only");
    }

    if config.ready_expiry_enabled {
        spawn_ready_sweeper(
            Arc::clone(&app_state.queue_service),
            chrono::Duration::minutes(config.ready_grace_minutes),
            Duration::from_secs(config.ready_sweep_interval_secs),
        );
    }

    let app = diner_gateway::build_app(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Plain text logs by default, JSON lines with `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Cancels `ready` parties that never checked in.
fn spawn_ready_sweeper(service: Arc<QueueService>, grace: chrono::Duration, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = service.expire_stale_ready(grace, chrono::Utc::now()).await;
            if expired > 0 {
                tracing::info!(expired, "cancelled ready entries past grace");
            }
        }
    });
    tracing::info!(grace_minutes = grace.num_minutes(), "ready expiry sweeper started");
}
