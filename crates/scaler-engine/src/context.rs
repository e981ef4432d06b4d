//! Per-reconcile state threaded through the stages.

use crate::error::ScalerError;
use crate::period::Resolution;
use crate::provider::ProviderHandle;
use chrono::{DateTime, Utc};
use crds::{ProviderSpec, Scaler, ScalingFailure, ScalingSuccess};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Namespaced name of a Scaler
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScalerKey {
    pub namespace: String,
    pub name: String,
}

impl ScalerKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a Scaler object (namespace defaults to "default")
    pub fn from_scaler(scaler: &Scaler) -> Self {
        Self::new(
            scaler.metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
            scaler.metadata.name.clone().unwrap_or_default(),
        )
    }
}

impl std::fmt::Display for ScalerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// State of one reconcile invocation.
///
/// Owned by a single invocation and moved from stage to stage. The requeue
/// delay is first-writer-wins: once a stage has requested a non-zero delay,
/// later requests are ignored.
#[derive(Debug)]
pub struct ReconcileContext {
    /// Scaler being reconciled
    pub key: ScalerKey,
    /// Evaluation instant for period resolution
    pub now: DateTime<Utc>,
    /// Cancellation signal raced by collaborator calls
    pub cancel: CancellationToken,

    pub scaler: Option<Scaler>,
    pub provider: Option<ProviderHandle>,
    pub resolution: Option<Resolution>,
    /// Resource selection handed to the mutators
    pub resources: Option<ProviderSpec>,

    pub success_results: Vec<ScalingSuccess>,
    pub failed_results: Vec<ScalingFailure>,

    /// Deletion cleanup is in progress
    pub should_finalize: bool,
    requeue_after: Option<Duration>,
}

impl ReconcileContext {
    pub fn new(key: ScalerKey, now: DateTime<Utc>, cancel: CancellationToken) -> Self {
        Self {
            key,
            now,
            cancel,
            scaler: None,
            provider: None,
            resolution: None,
            resources: None,
            success_results: Vec::new(),
            failed_results: Vec::new(),
            should_finalize: false,
            requeue_after: None,
        }
    }

    /// Request the next reconcile after `delay`.
    ///
    /// Returns whether the request took effect. Zero delays never do.
    pub fn request_requeue(&mut self, delay: Duration) -> bool {
        if delay.is_zero() || self.requeue_after.is_some() {
            return false;
        }
        self.requeue_after = Some(delay);
        true
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }

    /// The fetched Scaler
    pub fn scaler(&self) -> Result<&Scaler, ScalerError> {
        self.scaler.as_ref().ok_or(ScalerError::MissingState("scaler"))
    }

    /// Whether resources should be restored because the Scaler is going away
    pub fn restore_requested(&self) -> bool {
        self.should_finalize
            && self
                .scaler
                .as_ref()
                .is_some_and(|scaler| scaler.spec.restore_on_delete)
    }

    /// Finalizing without restore: provider work is skipped entirely
    pub fn finalize_without_restore(&self) -> bool {
        self.should_finalize && !self.restore_requested()
    }
}

/// Run a collaborator call, giving up with [`ScalerError::Cancelled`] when
/// `cancel` fires first.
pub async fn with_cancel<T, E, F>(cancel: &CancellationToken, call: F) -> Result<T, ScalerError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ScalerError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScalerError::Cancelled),
        result = call => result.map_err(Into::into),
    }
}
