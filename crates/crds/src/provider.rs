//! Provider-specific resource selection
//!
//! Each `Scaler` targets exactly one provider. The selection fields are passed
//! verbatim to the resource mutators of that provider.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tagged union of provider settings (`gcp: {...}` or `kubernetes: {...}`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProviderSpec {
    /// Google Compute Engine
    Gcp(GcpResources),

    /// Kubernetes workloads
    Kubernetes(KubernetesResources),
}

impl ProviderSpec {
    /// Short provider name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSpec::Gcp(_) => "gcp",
            ProviderSpec::Kubernetes(_) => "kubernetes",
        }
    }

    /// Resource kinds to process, in configured order
    pub fn types(&self) -> &[String] {
        match self {
            ProviderSpec::Gcp(gcp) => &gcp.types,
            ProviderSpec::Kubernetes(k8s) => &k8s.types,
        }
    }

    /// Default key looked up in the auth secret
    pub fn default_secret_key(&self) -> &'static str {
        match self {
            ProviderSpec::Gcp(_) => "credentials.json",
            ProviderSpec::Kubernetes(_) => "kubeconfig",
        }
    }
}

/// Compute Engine selection
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GcpResources {
    /// GCP project ID
    pub project_id: String,

    /// Zones to search (e.g. "europe-west1-b")
    pub zones: Vec<String>,

    /// Resource kinds ("vm-instances")
    #[serde(default = "default_gcp_types")]
    pub types: Vec<String>,

    /// Restrict to these instance names (empty = all matching)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Instance labels that must all match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_selector: BTreeMap<String, String>,
}

fn default_gcp_types() -> Vec<String> {
    vec!["vm-instances".to_string()]
}

/// Kubernetes workload selection
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesResources {
    /// Namespaces to search (empty = the Scaler's namespace)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,

    /// Workload kinds ("deployments", "statefulsets")
    #[serde(default = "default_kubernetes_types")]
    pub types: Vec<String>,

    /// Restrict to these workload names (empty = all matching)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Workload labels that must all match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_selector: BTreeMap<String, String>,
}

fn default_kubernetes_types() -> Vec<String> {
    vec!["deployments".to_string()]
}

/// Reference to a Secret in the Scaler's namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Secret name
    pub name: String,

    /// Key inside the secret (provider default when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
