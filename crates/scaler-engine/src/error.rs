//! Error types for the reconciliation engine.
//!
//! [`ScalerError`] names the underlying cause. [`ReconcileError`] wraps it
//! with the severity that decides how the controller schedules the next
//! attempt:
//!
//! - `Critical`: no progress possible this cycle; no explicit requeue, the
//!   controller's default backoff applies.
//! - `Recoverable`: transient; retried after the error requeue interval.
//!
//! Converting a bare `ScalerError` with `?` classifies it as `Critical`
//! (cancellation is the one exception, it is always `Recoverable`).

use crate::period::PeriodError;
use gcp_client::GcpError;
use thiserror::Error;

/// Underlying causes of reconciliation failures
#[derive(Debug, Error)]
pub enum ScalerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Scaler (or a referenced object) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Period declaration could not be resolved
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Credentials could not be loaded or a provider client could not be built
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Compute Engine API error
    #[error("GCP error: {0}")]
    Gcp(#[from] GcpError),

    /// Optimistic-concurrency conflict writing the Scaler
    #[error("Conflict updating {0}")]
    Conflict(String),

    /// No mutator exists for this resource kind on this provider
    #[error("resource kind '{kind}' not found for provider {provider}")]
    KindNotFound { kind: String, provider: &'static str },

    /// A stage ran without the state an earlier stage should have produced
    #[error("Missing reconcile state: {0}")]
    MissingState(&'static str),

    /// The reconcile was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScalerError {
    /// Whether this is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, ScalerError::Conflict(_))
    }
}

/// Classified reconciliation failure
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The cycle cannot make progress; rely on the controller's backoff
    #[error("critical: {0}")]
    Critical(#[source] ScalerError),

    /// Transient failure; retry after a short delay
    #[error("recoverable: {0}")]
    Recoverable(#[source] ScalerError),
}

impl ReconcileError {
    pub fn critical(cause: impl Into<ScalerError>) -> Self {
        ReconcileError::Critical(cause.into())
    }

    pub fn recoverable(cause: impl Into<ScalerError>) -> Self {
        ReconcileError::Recoverable(cause.into())
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, ReconcileError::Critical(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, ReconcileError::Recoverable(_))
    }

    /// The wrapped cause
    pub fn cause(&self) -> &ScalerError {
        match self {
            ReconcileError::Critical(cause) | ReconcileError::Recoverable(cause) => cause,
        }
    }

    /// Short label for logs and metrics
    pub fn severity(&self) -> &'static str {
        match self {
            ReconcileError::Critical(_) => "critical",
            ReconcileError::Recoverable(_) => "recoverable",
        }
    }
}

impl From<ScalerError> for ReconcileError {
    fn from(cause: ScalerError) -> Self {
        match cause {
            ScalerError::Cancelled => ReconcileError::Recoverable(cause),
            other => ReconcileError::Critical(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclassified_errors_are_critical() {
        let causes = vec![
            ScalerError::NotFound("default/nightly".to_string()),
            ScalerError::Auth("secret missing".to_string()),
            ScalerError::Conflict("default/nightly".to_string()),
            ScalerError::InvalidConfig("bad".to_string()),
            ScalerError::MissingState("scaler"),
        ];
        for cause in causes {
            let err: ReconcileError = cause.into();
            assert!(err.is_critical());
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_cancellation_is_recoverable() {
        let err: ReconcileError = ScalerError::Cancelled.into();
        assert!(err.is_recoverable());
        assert!(!err.is_critical());
        assert_eq!(err.severity(), "recoverable");
    }

    #[test]
    fn test_explicit_classification_keeps_cause() {
        let err = ReconcileError::recoverable(ScalerError::Conflict("default/nightly".to_string()));
        assert!(err.is_recoverable());
        assert!(err.cause().is_conflict());
        assert_eq!(err.to_string(), "recoverable: Conflict updating default/nightly");
    }
}
