//! CloudScaler Controller
//!
//! Reconciles `Scaler` resources: on every cycle the active period of each
//! Scaler is resolved and its GCP instances or Kubernetes workloads are
//! driven toward the state that period requests.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod watcher;

use anyhow::Result;
use config::ControllerConfig;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting CloudScaler Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Steady requeue: {:?}", config.engine.steady_requeue);
    info!("  Error requeue: {:?}", config.engine.error_requeue);
    info!("  Run-once grace: {:?}", config.engine.run_once_grace);
    info!("  Status update retries: {}", config.engine.status_update_retries);
    info!("  Metrics address: {}", config.metrics_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
