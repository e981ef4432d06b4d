//! Controller-specific error types.
//!
//! Engine failures keep their severity inside [`ControllerError::Reconcile`]
//! so the error policy can pick the requeue strategy.

use kube::Error as KubeError;
use scaler_engine::ReconcileError;
use thiserror::Error;

/// Errors that can occur in the CloudScaler controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// A reconcile cycle failed
    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metric registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe/metrics listener failed
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
