//! Kubernetes workload mutator
//!
//! Scaling down records the current replica count in the
//! `cloudscaler.microscaler.io/original-replicas` annotation and sets
//! replicas to 0. Scaling up (or restoring) sets the recorded count back and
//! drops the annotation. Workloads with nothing recorded keep their count.
//!
//! Success comments describe the resulting state, so a workload that was
//! already converged reports the same entry as one that was just scaled.

use super::{ResourceMutator, ScalingReport};
use crate::context::with_cancel;
use crate::error::ScalerError;
use crds::{KubernetesResources, PeriodType, ORIGINAL_REPLICAS_ANNOTATION};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Scalable workload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    /// Parse a configured kind ("deployments", "StatefulSet", ...)
    pub fn from_plural(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "deployments" | "deployment" => Some(WorkloadKind::Deployment),
            "statefulsets" | "statefulset" => Some(WorkloadKind::StatefulSet),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadKind::Deployment => f.write_str("Deployment"),
            WorkloadKind::StatefulSet => f.write_str("StatefulSet"),
        }
    }
}

/// The parts of a workload the mutator looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub replicas: i32,
    pub annotations: BTreeMap<String, String>,
}

impl Workload {
    fn from_parts(kind: WorkloadKind, namespace: &str, metadata: ObjectMeta, replicas: Option<i32>) -> Self {
        Self {
            kind,
            namespace: metadata.namespace.unwrap_or_else(|| namespace.to_string()),
            name: metadata.name.unwrap_or_default(),
            // Unset replicas default to 1 on the API server
            replicas: replicas.unwrap_or(1),
            annotations: metadata.annotations.unwrap_or_default(),
        }
    }

    /// Raw recorded replica count, if any
    pub fn recorded_replicas(&self) -> Option<&str> {
        self.annotations.get(ORIGINAL_REPLICAS_ANNOTATION).map(String::as_str)
    }
}

/// Workload access used by the mutator
#[async_trait::async_trait]
pub trait WorkloadApi: Send + Sync {
    /// List workloads of `kind` in `namespace`, optionally by label selector
    async fn list(&self, kind: WorkloadKind, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Workload>, ScalerError>;

    /// Set replicas. `Some(original)` records the count to restore later,
    /// `None` removes the record.
    async fn scale(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        replicas: i32,
        original: Option<i32>,
    ) -> Result<(), ScalerError>;
}

/// [`WorkloadApi`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeWorkloads {
    client: Client,
}

impl KubeWorkloads {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl WorkloadApi for KubeWorkloads {
    async fn list(&self, kind: WorkloadKind, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Workload>, ScalerError> {
        let params = match label_selector {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        };

        let workloads = match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.list(&params)
                    .await?
                    .items
                    .into_iter()
                    .map(|d| Workload::from_parts(kind, namespace, d.metadata, d.spec.and_then(|s| s.replicas)))
                    .collect()
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                api.list(&params)
                    .await?
                    .items
                    .into_iter()
                    .map(|s| Workload::from_parts(kind, namespace, s.metadata, s.spec.and_then(|s| s.replicas)))
                    .collect()
            }
        };
        Ok(workloads)
    }

    async fn scale(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        replicas: i32,
        original: Option<i32>,
    ) -> Result<(), ScalerError> {
        let mut annotations = serde_json::Map::new();
        annotations.insert(
            ORIGINAL_REPLICAS_ANNOTATION.to_string(),
            original.map_or(serde_json::Value::Null, |n| json!(n.to_string())),
        );
        let patch = json!({
            "metadata": { "annotations": annotations },
            "spec": { "replicas": replicas },
        });
        let params = PatchParams::default();

        match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
        }
        Ok(())
    }
}

/// Mutator for one workload kind
pub struct KubernetesWorkloads {
    api: Arc<dyn WorkloadApi>,
    workload_kind: WorkloadKind,
    kind: String,
    selection: KubernetesResources,
    default_namespace: String,
}

impl KubernetesWorkloads {
    pub fn new(
        api: Arc<dyn WorkloadApi>,
        workload_kind: WorkloadKind,
        kind: &str,
        selection: KubernetesResources,
        default_namespace: &str,
    ) -> Self {
        Self {
            api,
            workload_kind,
            kind: kind.to_string(),
            selection,
            default_namespace: default_namespace.to_string(),
        }
    }

    fn label_selector(&self) -> Option<String> {
        if self.selection.label_selector.is_empty() {
            return None;
        }
        let terms: Vec<String> = self
            .selection
            .label_selector
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        Some(terms.join(","))
    }

    fn selected(&self, workload: &Workload) -> bool {
        self.selection.names.is_empty() || self.selection.names.iter().any(|name| *name == workload.name)
    }

    async fn converge(&self, workload: &Workload, target: PeriodType, cancel: &CancellationToken, report: &mut ScalingReport) {
        let item = format!("{}/{}", workload.namespace, workload.name);

        let recorded = workload.recorded_replicas();
        let (replicas, original, comment) = match target {
            PeriodType::Down => {
                // An earlier record wins so a repeated scale-down cannot overwrite it
                let original = match recorded {
                    Some(raw) => raw.parse::<i32>().ok(),
                    None if workload.replicas > 0 => Some(workload.replicas),
                    None => None,
                };
                let comment = match original {
                    Some(count) => format!("scaled down from {} replicas", count),
                    None => "scaled down".to_string(),
                };
                if workload.replicas == 0 {
                    debug!("{} {} already scaled down", workload.kind, item);
                    report.succeeded(&self.kind, item, comment);
                    return;
                }
                (0, Some(original.unwrap_or(workload.replicas)), comment)
            }
            PeriodType::Up | PeriodType::Restore => match recorded {
                None => {
                    debug!("{} {} has no recorded replica count", workload.kind, item);
                    let comment = if workload.replicas > 0 {
                        format!("scaled up to {} replicas", workload.replicas)
                    } else {
                        "unchanged: no recorded replica count".to_string()
                    };
                    report.succeeded(&self.kind, item, comment);
                    return;
                }
                Some(raw) => match raw.parse::<i32>() {
                    Ok(count) => (count, None, format!("scaled up to {} replicas", count)),
                    Err(_) => {
                        report.failed(&self.kind, item, format!("invalid recorded replica count '{}'", raw));
                        return;
                    }
                },
            },
            PeriodType::NoAction => return,
        };

        match with_cancel(
            cancel,
            self.api.scale(workload.kind, &workload.namespace, &workload.name, replicas, original),
        )
        .await
        {
            Ok(()) => {
                info!("{} {} {}", workload.kind, item, comment);
                report.succeeded(&self.kind, item, comment);
            }
            Err(e) => {
                warn!("Failed to scale {} {}: {}", workload.kind, item, e);
                report.failed(&self.kind, item, e.to_string());
            }
        }
    }
}

#[async_trait::async_trait]
impl ResourceMutator for KubernetesWorkloads {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn set_state(&self, target: PeriodType, cancel: &CancellationToken) -> Result<ScalingReport, ScalerError> {
        let mut report = ScalingReport::default();
        if target == PeriodType::NoAction {
            return Ok(report);
        }

        let namespaces = if self.selection.namespaces.is_empty() {
            vec![self.default_namespace.clone()]
        } else {
            self.selection.namespaces.clone()
        };
        let selector = self.label_selector();
        let mut seen = BTreeSet::new();

        for namespace in &namespaces {
            let workloads = match with_cancel(
                cancel,
                self.api.list(self.workload_kind, namespace, selector.as_deref()),
            )
            .await
            {
                Ok(workloads) => workloads,
                Err(e) => {
                    warn!("Failed to list {} in {}: {}", self.kind, namespace, e);
                    report.failed(&self.kind, format!("{}/*", namespace), e.to_string());
                    continue;
                }
            };

            for workload in workloads.iter().filter(|w| self.selected(w)) {
                seen.insert(workload.name.clone());
                self.converge(workload, target, cancel, &mut report).await;
            }
        }

        for name in &self.selection.names {
            if !seen.contains(name) {
                report.failed(&self.kind, name.clone(), "workload not found in any selected namespace");
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWorkloadApi;

    fn mutator(api: &MockWorkloadApi, selection: KubernetesResources) -> KubernetesWorkloads {
        KubernetesWorkloads::new(Arc::new(api.clone()), WorkloadKind::Deployment, "deployments", selection, "apps")
    }

    #[tokio::test]
    async fn test_down_records_and_scales_to_zero() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "web", 3, &[("tier", "front")]);
        api.add(WorkloadKind::Deployment, "apps", "idle", 0, &[]);

        let report = mutator(&api, KubernetesResources::default())
            .set_state(PeriodType::Down, &CancellationToken::new())
            .await
            .unwrap();

        let web = api.get(WorkloadKind::Deployment, "apps", "web").unwrap();
        assert_eq!(web.replicas, 0);
        assert_eq!(web.recorded_replicas(), Some("3"));
        assert!(report.failed.is_empty());
        let comments: Vec<&str> = report.successful.iter().map(|s| s.comment.as_str()).collect();
        assert_eq!(comments, vec!["scaled down", "scaled down from 3 replicas"]);
    }

    #[tokio::test]
    async fn test_up_restores_recorded_count() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "web", 3, &[]);
        let m = mutator(&api, KubernetesResources::default());
        let cancel = CancellationToken::new();

        m.set_state(PeriodType::Down, &cancel).await.unwrap();
        // A second scale-down keeps the first record
        m.set_state(PeriodType::Down, &cancel).await.unwrap();
        let report = m.set_state(PeriodType::Restore, &cancel).await.unwrap();

        let web = api.get(WorkloadKind::Deployment, "apps", "web").unwrap();
        assert_eq!(web.replicas, 3);
        assert_eq!(web.recorded_replicas(), None);
        assert_eq!(report.successful[0].comment, "scaled up to 3 replicas");
    }

    #[tokio::test]
    async fn test_up_without_record_is_unchanged() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "web", 2, &[]);
        api.add(WorkloadKind::Deployment, "apps", "zero", 0, &[]);
        let report = mutator(&api, KubernetesResources::default())
            .set_state(PeriodType::Up, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(api.get(WorkloadKind::Deployment, "apps", "web").unwrap().replicas, 2);
        assert_eq!(report.successful[0].comment, "scaled up to 2 replicas");
        assert_eq!(report.successful[1].comment, "unchanged: no recorded replica count");
        assert!(api.scale_calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_cycles_report_identical_results() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "web", 3, &[]);
        let m = mutator(&api, KubernetesResources::default());
        let cancel = CancellationToken::new();

        let first = m.set_state(PeriodType::Down, &cancel).await.unwrap();
        let second = m.set_state(PeriodType::Down, &cancel).await.unwrap();
        assert_eq!(first, second);

        let first = m.set_state(PeriodType::Up, &cancel).await.unwrap();
        let second = m.set_state(PeriodType::Up, &cancel).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.scale_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_selection_by_namespace_names_and_labels() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "team-a", "web", 2, &[("env", "dev")]);
        api.add(WorkloadKind::Deployment, "team-a", "worker", 2, &[("env", "prod")]);
        api.add(WorkloadKind::Deployment, "team-b", "web", 2, &[("env", "dev")]);
        api.add(WorkloadKind::Deployment, "apps", "web", 2, &[("env", "dev")]);

        let selection = KubernetesResources {
            namespaces: vec!["team-a".to_string(), "team-b".to_string()],
            types: vec!["deployments".to_string()],
            names: vec!["web".to_string()],
            label_selector: [("env".to_string(), "dev".to_string())].into(),
        };
        let report = mutator(&api, selection)
            .set_state(PeriodType::Down, &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<&str> = report.successful.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["team-a/web", "team-b/web"]);
        assert_eq!(api.get(WorkloadKind::Deployment, "apps", "web").unwrap().replicas, 2);
    }

    #[tokio::test]
    async fn test_scale_failure_is_per_item() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "a", 1, &[]);
        api.add(WorkloadKind::Deployment, "apps", "b", 1, &[]);
        api.fail_scale("a");

        let report = mutator(&api, KubernetesResources::default())
            .set_state(PeriodType::Down, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "apps/a");
        assert_eq!(report.successful.len(), 1);
        assert_eq!(api.get(WorkloadKind::Deployment, "apps", "b").unwrap().replicas, 0);
    }

    #[tokio::test]
    async fn test_list_failure_skips_only_that_namespace() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "team-a", "web", 2, &[]);
        api.add(WorkloadKind::Deployment, "team-b", "web", 2, &[]);
        api.fail_list("team-a");

        let selection = KubernetesResources {
            namespaces: vec!["team-a".to_string(), "team-b".to_string()],
            ..KubernetesResources::default()
        };
        let report = mutator(&api, selection)
            .set_state(PeriodType::Down, &CancellationToken::new())
            .await
            .unwrap();

        let failed: Vec<&str> = report.failed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["team-a/*"]);
        let names: Vec<&str> = report.successful.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["team-b/web"]);
        assert_eq!(api.get(WorkloadKind::Deployment, "team-a", "web").unwrap().replicas, 2);
        assert_eq!(api.get(WorkloadKind::Deployment, "team-b", "web").unwrap().replicas, 0);
    }

    #[tokio::test]
    async fn test_invalid_record_is_reported() {
        let api = MockWorkloadApi::new();
        api.add(WorkloadKind::Deployment, "apps", "web", 0, &[(ORIGINAL_REPLICAS_ANNOTATION, "lots")]);
        let report = mutator(&api, KubernetesResources::default())
            .set_state(PeriodType::Up, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("lots"));
    }

    #[test]
    fn test_workload_kind_from_plural() {
        assert_eq!(WorkloadKind::from_plural("Deployments"), Some(WorkloadKind::Deployment));
        assert_eq!(WorkloadKind::from_plural("statefulset"), Some(WorkloadKind::StatefulSet));
        assert_eq!(WorkloadKind::from_plural("daemonsets"), None);
    }
}
