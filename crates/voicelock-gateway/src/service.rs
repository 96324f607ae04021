//! Gateway service lifecycle: wiring, bind, and shutdown.

use crate::domain::config::{GatewayConfig, VehicleConfig};
use crate::domain::error::GatewayError;
use crate::gateway::VoiceGateway;
use crate::orchestrator::ToggleOrchestrator;
use crate::router::{build_router, AppState};
use crate::security::clock::Clock;
use crate::vehicle::TessieClient;
use axum::Router;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Owns the wired router and the running server's shutdown handle.
pub struct GatewayService {
    config: GatewayConfig,
    router: Router,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GatewayService {
    /// Validate configuration and wire the pipeline.
    pub fn new(config: GatewayConfig, clock: Arc<dyn Clock>) -> Result<Self, GatewayError> {
        config.validate().map_err(GatewayError::Config)?;

        let orchestrator = build_orchestrator(&config.vehicle);
        if orchestrator.is_none() {
            info!("vehicle API token not configured; attempts will fail at the vehicle stage");
        }
        let gateway = Arc::new(VoiceGateway::new(&config, clock, orchestrator));
        let router = build_router(AppState {
            gateway,
            public_base_url: config.security.public_base_url.clone(),
        });

        Ok(Self {
            config,
            router,
            shutdown_tx: None,
        })
    }

    /// Bind the listener and serve in a background task.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| GatewayError::Bind(err.to_string()))?;
        info!(%addr, "voice gateway listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let router = self.router.clone();
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                error!(error = %err, "gateway server exited with error");
            }
        });
        Ok(())
    }

    /// Signal the server to drain and stop.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("gateway shutdown requested");
        }
    }

    /// The wired router, for in-process testing without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn build_orchestrator(vehicle: &VehicleConfig) -> Option<Arc<ToggleOrchestrator>> {
    let token = vehicle.access_token.as_ref()?;
    let client = TessieClient::with_retry(
        vehicle.api_base.clone(),
        token.clone(),
        vehicle.retry_pause,
        vehicle.max_retries,
    );
    Some(Arc::new(ToggleOrchestrator::new(Arc::new(client))))
}
