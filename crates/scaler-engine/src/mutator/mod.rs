//! Resource mutators
//!
//! A mutator converges one resource kind of one provider toward the state a
//! period requests. Per-item failures are reported in the [`ScalingReport`],
//! never as an error; an `Err` means the whole kind could not be processed.

pub mod gcp;
pub mod kubernetes;

use crate::error::ScalerError;
use crate::provider::ProviderHandle;
use crds::{PeriodType, ProviderSpec, ScalingFailure, ScalingSuccess};
use tokio_util::sync::CancellationToken;

/// Kind name for Compute Engine instances
pub const GCP_VM_INSTANCES: &str = "vm-instances";

/// Per-item outcome of one mutator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalingReport {
    pub successful: Vec<ScalingSuccess>,
    pub failed: Vec<ScalingFailure>,
}

impl ScalingReport {
    pub fn succeeded(&mut self, kind: &str, name: impl Into<String>, comment: impl Into<String>) {
        self.successful.push(ScalingSuccess {
            kind: kind.to_string(),
            name: name.into(),
            comment: comment.into(),
        });
    }

    pub fn failed(&mut self, kind: &str, name: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(ScalingFailure {
            kind: kind.to_string(),
            name: name.into(),
            reason: reason.into(),
        });
    }
}

/// Converges one resource kind
#[async_trait::async_trait]
pub trait ResourceMutator: Send + Sync {
    /// Resource kind as configured ("vm-instances", "deployments", ...)
    fn kind(&self) -> &str;

    /// Drive every selected item toward `target`
    async fn set_state(&self, target: PeriodType, cancel: &CancellationToken) -> Result<ScalingReport, ScalerError>;
}

/// Mutator for `kind` on the provider behind `handle`.
///
/// `default_namespace` applies to Kubernetes selections without namespaces.
/// Unknown kinds, or a handle that does not match the resource selection,
/// give [`ScalerError::KindNotFound`].
pub fn build_mutator(
    handle: &ProviderHandle,
    resources: &ProviderSpec,
    kind: &str,
    default_namespace: &str,
) -> Result<Box<dyn ResourceMutator>, ScalerError> {
    let not_found = || ScalerError::KindNotFound {
        kind: kind.to_string(),
        provider: resources.name(),
    };

    match (handle, resources) {
        (ProviderHandle::Gcp(client), ProviderSpec::Gcp(selection)) => {
            match kind.to_ascii_lowercase().as_str() {
                GCP_VM_INSTANCES | "instances" => Ok(Box::new(gcp::GcpInstances::new(
                    client.clone(),
                    kind,
                    selection.clone(),
                ))),
                _ => Err(not_found()),
            }
        }
        (ProviderHandle::Kubernetes(api), ProviderSpec::Kubernetes(selection)) => {
            let workload_kind = kubernetes::WorkloadKind::from_plural(kind).ok_or_else(not_found)?;
            Ok(Box::new(kubernetes::KubernetesWorkloads::new(
                api.clone(),
                workload_kind,
                kind,
                selection.clone(),
                default_namespace,
            )))
        }
        _ => Err(not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWorkloadApi;
    use crds::{GcpResources, KubernetesResources};
    use gcp_client::MockGcpClient;
    use std::sync::Arc;

    fn gcp_handle() -> ProviderHandle {
        ProviderHandle::Gcp(Arc::new(MockGcpClient::new()))
    }

    fn k8s_handle() -> ProviderHandle {
        ProviderHandle::Kubernetes(Arc::new(MockWorkloadApi::new()))
    }

    #[test]
    fn test_build_known_kinds() {
        let gcp = ProviderSpec::Gcp(GcpResources::default());
        assert_eq!(build_mutator(&gcp_handle(), &gcp, "vm-instances", "default").unwrap().kind(), "vm-instances");
        assert_eq!(build_mutator(&gcp_handle(), &gcp, "instances", "default").unwrap().kind(), "instances");

        let k8s = ProviderSpec::Kubernetes(KubernetesResources::default());
        assert_eq!(build_mutator(&k8s_handle(), &k8s, "deployments", "default").unwrap().kind(), "deployments");
        assert_eq!(build_mutator(&k8s_handle(), &k8s, "StatefulSets", "default").unwrap().kind(), "StatefulSets");
    }

    #[test]
    fn test_unknown_kind_is_kind_not_found() {
        let k8s = ProviderSpec::Kubernetes(KubernetesResources::default());
        let err = build_mutator(&k8s_handle(), &k8s, "cronjobs", "default").err().unwrap();
        assert!(matches!(err, ScalerError::KindNotFound { ref kind, provider: "kubernetes" } if kind == "cronjobs"));
    }

    #[test]
    fn test_provider_mismatch_is_kind_not_found() {
        let gcp = ProviderSpec::Gcp(GcpResources::default());
        let err = build_mutator(&k8s_handle(), &gcp, "vm-instances", "default").err().unwrap();
        assert!(matches!(err, ScalerError::KindNotFound { .. }));
    }
}
