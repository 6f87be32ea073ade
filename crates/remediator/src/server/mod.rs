mod receivers;
mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{config::Config, remediation::Remediator, Result};

pub use receivers::{diagnose, Diagnosis, NoPayloadReason};
pub use routes::{REMEDIATION_FAILED, REMEDIATION_TRIGGERED};

pub(crate) struct AppState {
    pub(crate) remediator: Arc<dyn Remediator>,
}

pub struct Server {
    remediator: Arc<dyn Remediator>,
}

impl Server {
    pub fn new(_config: &Config, remediator: Arc<dyn Remediator>) -> Self {
        Self { remediator }
    }

    /// Every POST is an alert, whatever the path and size of its body.
    /// `/health` and `/metrics` answer GET as well.
    pub fn build_router(self) -> Router {
        let state = Arc::new(AppState {
            remediator: self.remediator,
        });

        Router::new()
            .route("/health", get(routes::health).post(routes::receive_alert))
            .route("/metrics", get(routes::metrics).post(routes::receive_alert))
            .route("/", post(routes::receive_alert))
            .route("/{*path}", post(routes::receive_alert))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(DefaultBodyLimit::disable()),
            )
            .with_state(state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        info!("Remediation command: {}", self.remediator.describe());

        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
