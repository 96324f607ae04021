//! Voicelock server runtime.
//!
//! Loads configuration from the environment, initializes logging, wires the
//! gateway service, and runs until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use voicelock_gateway::{GatewayConfig, GatewayService, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;
    info!(
        addr = %config.http_addr(),
        allowed_callers = config.security.allowed_callers.len(),
        "starting voicelock"
    );

    // Wire and start the gateway
    let mut service = GatewayService::new(config, Arc::new(SystemClock))?;
    service.start().await?;

    info!("gateway is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    service.shutdown();
    Ok(())
}
