//! Prometheus metrics and the probe/metrics HTTP endpoints.

use crate::error::ControllerError;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use scaler_engine::{ReconcileError, ReconcileOutcome};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reconcile metrics
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Reconciles by outcome ("success", "critical", "recoverable")
    reconciliations: IntCounterVec,
    /// Reconcile duration by outcome
    duration_seconds: HistogramVec,
    /// Items processed by result ("succeeded", "failed")
    scaled_items: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new_custom(Some("cloudscaler".to_string()), None)?;

        let reconciliations = IntCounterVec::new(
            Opts::new("reconciliations_total", "Reconcile cycles by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciliations.clone()))?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new("reconcile_duration_seconds", "Reconcile cycle duration")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(duration_seconds.clone()))?;

        let scaled_items = IntCounterVec::new(
            Opts::new("scaled_items_total", "Resources processed by the scaling stage"),
            &["result"],
        )?;
        registry.register(Box::new(scaled_items.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            duration_seconds,
            scaled_items,
        })
    }

    pub fn record_success(&self, outcome: &ReconcileOutcome, elapsed: Duration) {
        self.observe("success", elapsed);
        self.scaled_items
            .with_label_values(&["succeeded"])
            .inc_by(outcome.successful.len() as u64);
        self.scaled_items
            .with_label_values(&["failed"])
            .inc_by(outcome.failed.len() as u64);
    }

    pub fn record_failure(&self, error: &ReconcileError, elapsed: Duration) {
        self.observe(error.severity(), elapsed);
    }

    fn observe(&self, outcome: &str, elapsed: Duration) {
        self.reconciliations.with_label_values(&[outcome]).inc();
        self.duration_seconds
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Shared state of the HTTP endpoints
#[derive(Clone)]
pub struct ServerState {
    pub metrics: Metrics,
    /// Set once the Scaler watch is running
    pub ready: Arc<AtomicBool>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<ServerState>) -> impl IntoResponse {
    if state.ready.load(Ordering::SeqCst) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

async fn metrics_handler(State(state): State<ServerState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}

/// Serve the endpoints on `addr` until the listener fails
pub async fn serve(addr: SocketAddr, state: ServerState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Serving metrics and probes on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use scaler_engine::ScalerError;
    use tower::ServiceExt;

    fn state() -> ServerState {
        ServerState {
            metrics: Metrics::new().unwrap(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn get_path(state: ServerState, path: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_probes() {
        let state = state();
        assert_eq!(get_path(state.clone(), "/healthz").await.0, StatusCode::OK);
        assert_eq!(get_path(state.clone(), "/readyz").await.0, StatusCode::SERVICE_UNAVAILABLE);
        state.ready.store(true, Ordering::SeqCst);
        assert_eq!(get_path(state, "/readyz").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let state = state();
        state
            .metrics
            .record_failure(&ReconcileError::critical(ScalerError::Auth("denied".to_string())), Duration::from_millis(20));

        let (status, body) = get_path(state, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("cloudscaler_reconciliations_total{outcome=\"critical\"} 1"));
        assert!(body.contains("cloudscaler_reconcile_duration_seconds"));
    }
}
