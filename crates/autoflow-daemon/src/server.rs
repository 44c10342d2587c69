//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::retention::RetentionSweeper;
use autoflow_engine::Orchestrator;
use autoflow_gateway::WebhookGateway;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Autoflow Daemon Server
pub struct Server {
    config: DaemonConfig,
    orchestrator: Orchestrator,
    sweeper: Arc<RetentionSweeper>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let gateway = Arc::new(WebhookGateway::new(config.gateway.clone())?);
        let orchestrator = Orchestrator::new(config.orchestrator.clone(), gateway);
        let sweeper = RetentionSweeper::new(config.retention.clone(), orchestrator.clone());

        Ok(Self {
            config,
            orchestrator,
            sweeper,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        // Create app state and router
        let state = AppState::new(self.orchestrator.clone(), self.config.retention.days);
        let app = create_router(state, self.config.server.enable_cors);

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Autoflow daemon listening on {}", addr);
        tracing::info!(
            engine_url = %self.config.gateway.engine_url,
            webhook_server_url = %self.config.gateway.webhook_server_url,
            "Workflow engine endpoints"
        );

        // Start background work
        self.orchestrator.start().await;
        self.sweeper.start().await;

        // Run server with graceful shutdown
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()));

        tracing::info!("Autoflow daemon shutting down");

        // Stop background work even when serving failed
        self.sweeper.stop().await;
        self.orchestrator.stop().await;

        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
