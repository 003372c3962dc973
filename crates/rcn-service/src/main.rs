//! RCN Ledger Service - HTTP API for the loyalty token ledger
//!
//! This is the main entry point for the rcn-service binary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rcn_core::EarningCaps;
use rcn_service::{create_router, sweeper, AppState, ServiceConfig};
use rcn_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rcn=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RCN Ledger Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        minter_configured = %config.minter_api_url.is_some(),
        daily_earn_cap = config.daily_earn_cap,
        monthly_earn_cap = config.monthly_earn_cap,
        session_ttl_seconds = config.session_ttl_seconds,
        "Service configuration loaded"
    );

    // Initialize RocksDB store with the configured engine parameters
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open_with(
        &config.data_dir,
        EarningCaps {
            daily: config.daily_earn_cap,
            monthly: config.monthly_earn_cap,
        },
        ChronoDuration::seconds(config.session_ttl_seconds),
    )?);

    // Build app state
    let state = AppState::new(store, config.clone());

    // Start the session expiry sweep
    let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);
    sweeper::spawn(Arc::new(state.clone()), sweep_interval);
    tracing::info!(interval_seconds = config.sweep_interval_seconds, "Session sweeper started");

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
