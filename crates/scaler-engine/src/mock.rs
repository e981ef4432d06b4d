//! In-memory collaborators for unit testing
//!
//! [`MockScalerStore`] behaves like the API server for Scaler objects: every
//! write bumps `resourceVersion`, stale writes are rejected as conflicts and a
//! deleting object disappears once its last finalizer is gone.

use crate::context::ScalerKey;
use crate::error::ScalerError;
use crate::mutator::kubernetes::{Workload, WorkloadApi, WorkloadKind};
use crate::provider::{ProviderConnector, ProviderHandle};
use crate::store::ScalerStore;
use crds::{KubernetesResources, ProviderSpec, Scaler, ScalerSpec, ScalerStatus, ORIGINAL_REPLICAS_ANNOTATION};
use gcp_client::MockGcpClient;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Scaler targeting Deployments in its own namespace, restoring on delete
pub fn test_scaler(namespace: &str, name: &str) -> Scaler {
    Scaler {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: ScalerSpec {
            periods: vec![],
            restore_on_delete: true,
            auth_secret_ref: None,
            provider: ProviderSpec::Kubernetes(KubernetesResources {
                types: vec!["deployments".to_string()],
                ..Default::default()
            }),
        },
        status: None,
    }
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<ScalerKey, Scaler>,
    version: u64,
    conflicts: u32,
    write_attempts: u32,
    fail_get: bool,
}

impl StoreState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// Mock Scaler store for testing
#[derive(Clone, Default)]
pub struct MockScalerStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockScalerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `scaler` as a new version and return the stored copy
    pub fn insert(&self, mut scaler: Scaler) -> Scaler {
        let mut state = self.state.lock().unwrap();
        scaler.metadata.resource_version = Some(state.next_version());
        state.objects.insert(ScalerKey::from_scaler(&scaler), scaler.clone());
        scaler
    }

    /// Current stored copy
    pub fn stored(&self, key: &ScalerKey) -> Option<Scaler> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    /// Reject the next `count` writes with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().unwrap().conflicts = count;
    }

    /// Make reads fail
    pub fn fail_get(&self) {
        self.state.lock().unwrap().fail_get = true;
    }

    /// Writes attempted so far, rejected ones included
    pub fn write_attempts(&self) -> u32 {
        self.state.lock().unwrap().write_attempts
    }

    fn write(&self, scaler: &Scaler, apply: impl FnOnce(&mut Scaler)) -> Result<Scaler, ScalerError> {
        let key = ScalerKey::from_scaler(scaler);
        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;

        if state.conflicts > 0 {
            state.conflicts -= 1;
            return Err(ScalerError::Conflict(key.to_string()));
        }
        let Some(stored) = state.objects.get(&key) else {
            return Err(ScalerError::NotFound(key.to_string()));
        };
        if stored.metadata.resource_version != scaler.metadata.resource_version {
            return Err(ScalerError::Conflict(key.to_string()));
        }

        let mut updated = stored.clone();
        apply(&mut updated);
        updated.metadata.resource_version = Some(state.next_version());

        let released = updated.is_deleting() && updated.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty());
        if released {
            state.objects.remove(&key);
        } else {
            state.objects.insert(key, updated.clone());
        }
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl ScalerStore for MockScalerStore {
    async fn get(&self, key: &ScalerKey) -> Result<Option<Scaler>, ScalerError> {
        let state = self.state.lock().unwrap();
        if state.fail_get {
            return Err(ScalerError::InvalidConfig(format!("mock read failure for {}", key)));
        }
        Ok(state.objects.get(key).cloned())
    }

    async fn replace_finalizers(&self, scaler: &Scaler, finalizers: Vec<String>) -> Result<Scaler, ScalerError> {
        self.write(scaler, |stored| stored.metadata.finalizers = Some(finalizers))
    }

    async fn replace_status(&self, scaler: &Scaler, status: &ScalerStatus) -> Result<Scaler, ScalerError> {
        self.write(scaler, |stored| stored.status = Some(status.clone()))
    }
}

#[derive(Default)]
struct WorkloadState {
    // (kind, namespace, name) -> workload and its labels
    workloads: BTreeMap<(WorkloadKind, String, String), (Workload, BTreeMap<String, String>)>,
    failing_scale: HashSet<String>,
    failing_list: HashSet<String>,
    scale_calls: Vec<String>,
}

/// Mock workload API for testing
#[derive(Clone, Default)]
pub struct MockWorkloadApi {
    state: Arc<Mutex<WorkloadState>>,
}

impl MockWorkloadApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workload (for test setup)
    pub fn add(&self, kind: WorkloadKind, namespace: &str, name: &str, replicas: i32, labels: &[(&str, &str)]) {
        let mut annotations = BTreeMap::new();
        let mut label_map = BTreeMap::new();
        for (key, value) in labels {
            // The replica record is an annotation, not a label
            if *key == ORIGINAL_REPLICAS_ANNOTATION {
                annotations.insert(key.to_string(), value.to_string());
            } else {
                label_map.insert(key.to_string(), value.to_string());
            }
        }
        let workload = Workload {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            replicas,
            annotations,
        };
        self.state
            .lock()
            .unwrap()
            .workloads
            .insert((kind, namespace.to_string(), name.to_string()), (workload, label_map));
    }

    pub fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<Workload> {
        self.state
            .lock()
            .unwrap()
            .workloads
            .get(&(kind, namespace.to_string(), name.to_string()))
            .map(|(workload, _)| workload.clone())
    }

    /// Make scale calls for workloads with this name fail
    pub fn fail_scale(&self, name: &str) {
        self.state.lock().unwrap().failing_scale.insert(name.to_string());
    }

    /// Make list calls in this namespace fail
    pub fn fail_list(&self, namespace: &str) {
        self.state.lock().unwrap().failing_list.insert(namespace.to_string());
    }

    /// Recorded "namespace/name=replicas" scale calls, in order
    pub fn scale_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().scale_calls.clone()
    }
}

/// Evaluate a "k=v,k2=v2" selector
fn matches_selector(labels: &BTreeMap<String, String>, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    selector.split(',').all(|term| match term.split_once('=') {
        Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
        None => false,
    })
}

#[async_trait::async_trait]
impl WorkloadApi for MockWorkloadApi {
    async fn list(&self, kind: WorkloadKind, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Workload>, ScalerError> {
        let state = self.state.lock().unwrap();
        if state.failing_list.contains(namespace) {
            return Err(ScalerError::NotFound(format!("mock failure listing {}", namespace)));
        }
        Ok(state
            .workloads
            .iter()
            .filter(|((k, ns, _), (_, labels))| *k == kind && ns == namespace && matches_selector(labels, label_selector))
            .map(|(_, (workload, _))| workload.clone())
            .collect())
    }

    async fn scale(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        replicas: i32,
        original: Option<i32>,
    ) -> Result<(), ScalerError> {
        let mut state = self.state.lock().unwrap();
        state.scale_calls.push(format!("{}/{}={}", namespace, name, replicas));
        if state.failing_scale.contains(name) {
            return Err(ScalerError::Conflict(format!("mock failure scaling {}/{}", namespace, name)));
        }
        let (workload, _) = state
            .workloads
            .get_mut(&(kind, namespace.to_string(), name.to_string()))
            .ok_or_else(|| ScalerError::NotFound(format!("{} {}/{}", kind, namespace, name)))?;
        workload.replicas = replicas;
        match original {
            Some(count) => {
                workload
                    .annotations
                    .insert(ORIGINAL_REPLICAS_ANNOTATION.to_string(), count.to_string());
            }
            None => {
                workload.annotations.remove(ORIGINAL_REPLICAS_ANNOTATION);
            }
        }
        Ok(())
    }
}

/// Mock provider connector handing out a fixed handle
#[derive(Clone)]
pub struct MockProviderConnector {
    handle: Result<ProviderHandle, String>,
    connects: Arc<AtomicU32>,
}

impl MockProviderConnector {
    pub fn kubernetes(api: MockWorkloadApi) -> Self {
        Self::with_handle(ProviderHandle::Kubernetes(Arc::new(api)))
    }

    pub fn gcp(client: MockGcpClient) -> Self {
        Self::with_handle(ProviderHandle::Gcp(Arc::new(client)))
    }

    /// Connector whose every attempt fails with an auth error
    pub fn failing(reason: &str) -> Self {
        Self {
            handle: Err(reason.to_string()),
            connects: Arc::new(AtomicU32::new(0)),
        }
    }

    fn with_handle(handle: ProviderHandle) -> Self {
        Self {
            handle: Ok(handle),
            connects: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of connect calls so far
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderConnector for MockProviderConnector {
    async fn connect(&self, _scaler: &Scaler) -> Result<ProviderHandle, ScalerError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.handle.clone().map_err(ScalerError::Auth)
    }
}
