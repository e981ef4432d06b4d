//! Scaler persistence with optimistic concurrency.
//!
//! Every write carries the `resourceVersion` it was computed from, so the API
//! server rejects it with 409 when the object changed in between. Callers use
//! [`apply_with_retry`] to re-fetch and re-apply on conflict.

use crate::context::{with_cancel, ScalerKey};
use crate::error::ScalerError;
use crds::{Scaler, ScalerStatus, SCALER_FINALIZER};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read and write access to Scaler objects
#[async_trait::async_trait]
pub trait ScalerStore: Send + Sync {
    /// Fetch the latest version, `None` when it does not exist
    async fn get(&self, key: &ScalerKey) -> Result<Option<Scaler>, ScalerError>;

    /// Replace `metadata.finalizers`, conditional on `scaler`'s resourceVersion
    async fn replace_finalizers(&self, scaler: &Scaler, finalizers: Vec<String>) -> Result<Scaler, ScalerError>;

    /// Replace the status subresource, conditional on `scaler`'s resourceVersion
    async fn replace_status(&self, scaler: &Scaler, status: &ScalerStatus) -> Result<Scaler, ScalerError>;
}

/// A change to a Scaler applied under conflict retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddFinalizer,
    RemoveFinalizer,
    Status(ScalerStatus),
}

impl Mutation {
    fn describe(&self) -> &'static str {
        match self {
            Mutation::AddFinalizer => "finalizer add",
            Mutation::RemoveFinalizer => "finalizer removal",
            Mutation::Status(_) => "status update",
        }
    }

    /// The object already reflects this change
    pub fn is_satisfied(&self, scaler: &Scaler) -> bool {
        match self {
            Mutation::AddFinalizer => scaler.has_finalizer(),
            Mutation::RemoveFinalizer => !scaler.has_finalizer(),
            Mutation::Status(status) => scaler.status.as_ref() == Some(status),
        }
    }
}

/// Apply `mutation`, re-fetching and retrying on conflict up to `attempts` times.
///
/// Writes are skipped when the object already reflects the change.
pub async fn apply_with_retry(
    store: &dyn ScalerStore,
    scaler: &Scaler,
    mutation: &Mutation,
    attempts: u32,
    cancel: &CancellationToken,
) -> Result<Scaler, ScalerError> {
    let key = ScalerKey::from_scaler(scaler);
    let attempts = attempts.max(1);
    let mut current = scaler.clone();

    for attempt in 1..=attempts {
        if mutation.is_satisfied(&current) {
            debug!("{} for {} already applied", mutation.describe(), key);
            return Ok(current);
        }

        let result = match mutation {
            Mutation::AddFinalizer => {
                let mut finalizers = current.metadata.finalizers.clone().unwrap_or_default();
                finalizers.push(SCALER_FINALIZER.to_string());
                with_cancel(cancel, store.replace_finalizers(&current, finalizers)).await
            }
            Mutation::RemoveFinalizer => {
                let finalizers = current
                    .metadata
                    .finalizers
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|f| f != SCALER_FINALIZER)
                    .collect();
                with_cancel(cancel, store.replace_finalizers(&current, finalizers)).await
            }
            Mutation::Status(status) => with_cancel(cancel, store.replace_status(&current, status)).await,
        };

        match result {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < attempts => {
                warn!(
                    "Conflict during {} for {} (attempt {}/{}), re-fetching",
                    mutation.describe(),
                    key,
                    attempt,
                    attempts
                );
                match with_cancel(cancel, store.get(&key)).await? {
                    Some(latest) => current = latest,
                    // Garbage-collected once the last finalizer went away
                    None if *mutation == Mutation::RemoveFinalizer => return Ok(current),
                    None => return Err(ScalerError::NotFound(key.to_string())),
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(ScalerError::Conflict(format!("{} ({} attempts)", key, attempts)))
}

/// [`ScalerStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeScalerStore {
    client: Client,
}

impl KubeScalerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Scaler> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Metadata part of a conditional merge patch
fn precondition(scaler: &Scaler) -> serde_json::Value {
    match &scaler.metadata.resource_version {
        Some(version) => json!({ "resourceVersion": version }),
        None => json!({}),
    }
}

fn write_error(key: &ScalerKey, error: kube::Error) -> ScalerError {
    match error {
        kube::Error::Api(ref response) if response.code == 409 => ScalerError::Conflict(key.to_string()),
        kube::Error::Api(ref response) if response.code == 404 => ScalerError::NotFound(key.to_string()),
        other => ScalerError::Kube(other),
    }
}

#[async_trait::async_trait]
impl ScalerStore for KubeScalerStore {
    async fn get(&self, key: &ScalerKey) -> Result<Option<Scaler>, ScalerError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn replace_finalizers(&self, scaler: &Scaler, finalizers: Vec<String>) -> Result<Scaler, ScalerError> {
        let key = ScalerKey::from_scaler(scaler);
        let mut metadata = precondition(scaler);
        metadata["finalizers"] = json!(finalizers);
        let patch = json!({ "metadata": metadata });

        self.api(&key.namespace)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| write_error(&key, e))
    }

    async fn replace_status(&self, scaler: &Scaler, status: &ScalerStatus) -> Result<Scaler, ScalerError> {
        let key = ScalerKey::from_scaler(scaler);
        let patch = json!({
            "metadata": precondition(scaler),
            "status": status,
        });

        self.api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| write_error(&key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{test_scaler, MockScalerStore};

    #[tokio::test]
    async fn test_add_finalizer_retries_on_conflict() {
        let store = MockScalerStore::new();
        let scaler = store.insert(test_scaler("default", "nightly"));
        store.inject_conflicts(2);

        let updated = apply_with_retry(&store, &scaler, &Mutation::AddFinalizer, 5, &CancellationToken::new())
            .await
            .unwrap();
        assert!(updated.has_finalizer());
        assert_eq!(store.write_attempts(), 3);
    }

    #[tokio::test]
    async fn test_conflicts_exhaust_retries() {
        let store = MockScalerStore::new();
        let scaler = store.insert(test_scaler("default", "nightly"));
        store.inject_conflicts(10);

        let err = apply_with_retry(&store, &scaler, &Mutation::AddFinalizer, 3, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.write_attempts(), 3);
    }

    #[tokio::test]
    async fn test_stale_version_is_refetched() {
        let store = MockScalerStore::new();
        let stale = store.insert(test_scaler("default", "nightly"));
        // Someone else writes in between
        let mut edited = stale.clone();
        edited.spec.restore_on_delete = false;
        store.insert(edited);

        let updated = apply_with_retry(&store, &stale, &Mutation::AddFinalizer, 5, &CancellationToken::new())
            .await
            .unwrap();
        assert!(updated.has_finalizer());
        assert!(!updated.spec.restore_on_delete);
        assert_eq!(store.write_attempts(), 2);
    }

    #[tokio::test]
    async fn test_satisfied_mutation_skips_write() {
        let store = MockScalerStore::new();
        let mut scaler = test_scaler("default", "nightly");
        scaler.status = Some(ScalerStatus::default());
        let scaler = store.insert(scaler);

        let status = Mutation::Status(ScalerStatus::default());
        apply_with_retry(&store, &scaler, &status, 5, &CancellationToken::new())
            .await
            .unwrap();
        apply_with_retry(&store, &scaler, &Mutation::RemoveFinalizer, 5, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(store.write_attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_write() {
        let store = MockScalerStore::new();
        let scaler = store.insert(test_scaler("default", "nightly"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = apply_with_retry(&store, &scaler, &Mutation::AddFinalizer, 5, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScalerError::Cancelled));
    }
}
