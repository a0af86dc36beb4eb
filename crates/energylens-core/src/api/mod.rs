//! REST API implementation
//!
//! This module provides the HTTP API for EnergyLens.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analytics::ReportBuilder;
use crate::error::Result;

/// HTTP API server
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(reports: ReportBuilder, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            state: AppState {
                reports,
                prometheus,
            },
        }
    }

    /// Serve until Ctrl+C
    pub async fn serve(self, addr: &str) -> Result<()> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = create_router(self.state)
            .layer(TraceLayer::new_for_http())
            .layer(cors);

        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                info!("Ctrl+C received, shutting down...");
            })
            .await?;

        Ok(())
    }
}
