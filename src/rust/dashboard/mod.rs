//! Churn dashboard server
//!
//! Serves the dashboard page (filters, charts, prediction form) and a small
//! JSON API over the same dataset and predictor.

mod api;
pub mod charts;
mod error;
mod handlers;
pub mod page;
mod state;

pub use api::create_router;
pub use charts::{bar_chart, ChartError, DashboardCharts};
pub use error::ServerError;
pub use handlers::{FilterQuery, PredictResponse, StatsResponse};
pub use state::{AppState, IMPORTANCE_TOP};

use std::sync::Arc;
use std::time::Instant;
use log::{error, info};
use tokio::net::TcpListener;

use crate::config::DashboardConfig;

/// Bind the configured address. Host names such as `localhost` are resolved.
async fn bind(config: &DashboardConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(config.address()).await
}

/// Load the artifacts named by `config` and serve until ctrl+c
pub async fn run_server(config: DashboardConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    info!(
        "Loading dataset {:?} and model {:?}",
        config.data_path, config.model_path
    );

    let state = Arc::new(AppState::load(config)?);
    let app = create_router(Arc::clone(&state));

    let listener = bind(&state.config).await?;
    let addr = listener.local_addr()?;
    info!("Artifacts loaded in {:.2?}", start.elapsed());
    info!("Dashboard available at http://{}", addr);
    info!("Health endpoint available at http://{}/api/health", addr);

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
        info!(
            "Shutdown signal received after {:.2?}, stopping server gracefully",
            start.elapsed()
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact_manager::ArtifactManager;

    fn config(host: &str) -> DashboardConfig {
        DashboardConfig::for_artifacts(&ArtifactManager::new("/tmp/churnboard")).with_address(host, 0)
    }

    #[tokio::test]
    async fn test_bind_resolves_host_names() {
        let config = config("localhost");
        let listener = bind(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_reports_unresolvable_host() {
        let config = config("no such host");
        assert!(bind(&config).await.is_err());
    }
}
