//! Main controller implementation.
//!
//! Wires the engine to the Kubernetes API and runs the Scaler watcher next to
//! the metrics/probe server.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics, ServerState};
use crate::watcher::{watch_scalers, WatchContext};
use crds::Scaler;
use kube::{Api, Client};
use scaler_engine::{KubeProviderConnector, KubeScalerStore, ScalerEngine};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Backoff bounds for critical failures
const CRITICAL_BACKOFF_MIN: Duration = Duration::from_secs(30);
const CRITICAL_BACKOFF_MAX: Duration = Duration::from_secs(600);

/// CloudScaler controller
pub struct Controller {
    scaler_watcher: JoinHandle<Result<(), ControllerError>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Connects to the cluster and starts the background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing CloudScaler Controller");

        let client = Client::try_default().await?;
        let engine = ScalerEngine::new(
            Arc::new(KubeScalerStore::new(client.clone())),
            Arc::new(KubeProviderConnector::new(client.clone())),
            config.engine.clone(),
        );

        let scalers: Api<Scaler> = match &config.namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };

        let metrics = Metrics::new()?;
        let ready = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let ctx = Arc::new(WatchContext {
            engine,
            metrics: metrics.clone(),
            backoff: BackoffTracker::new(CRITICAL_BACKOFF_MIN, CRITICAL_BACKOFF_MAX),
            shutdown: shutdown.clone(),
        });

        let scaler_watcher = {
            let ready = ready.clone();
            tokio::spawn(async move { watch_scalers(scalers, ctx, ready).await })
        };

        let metrics_server = {
            let state = ServerState { metrics, ready };
            let addr = config.metrics_addr;
            tokio::spawn(async move { metrics::serve(addr, state).await })
        };

        Ok(Self {
            scaler_watcher,
            metrics_server,
            shutdown,
        })
    }

    /// Runs until the watcher or the server exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("CloudScaler Controller running");

        let result = tokio::select! {
            result = &mut self.scaler_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Scaler watcher panicked: {}", e)))?
            }
            result = &mut self.metrics_server => {
                result.map_err(|e| ControllerError::Watch(format!("Metrics server panicked: {}", e)))?
            }
        };

        // In-flight provider calls give up once the controller stops
        self.shutdown.cancel();
        self.metrics_server.abort();
        result
    }
}
