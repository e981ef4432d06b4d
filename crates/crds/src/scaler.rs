//! Scaler CRD
//!
//! Schedules the state of a group of cloud resources.

use crate::period::{PeriodSpec, PeriodType};
use crate::provider::{ProviderSpec, SecretReference};
use crate::SCALER_FINALIZER;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ScalerSpec defines the periods and the resources they apply to
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudscaler.microscaler.io",
    version = "v1alpha1",
    kind = "Scaler",
    namespaced,
    status = "ScalerStatus",
    shortname = "scl",
    printcolumn = r#"{"name":"Period", "type":"string", "jsonPath":".status.currentPeriod.name"}"#,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".status.currentPeriod.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ScalerSpec {
    /// Ordered periods; the first active one wins
    #[serde(default)]
    pub periods: Vec<PeriodSpec>,

    /// Restore resources to their original state when the Scaler is deleted
    #[serde(default = "default_restore_on_delete")]
    pub restore_on_delete: bool,

    /// Secret holding provider credentials (ambient credentials when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret_ref: Option<SecretReference>,

    /// Provider and resource selection
    pub provider: ProviderSpec,
}

fn default_restore_on_delete() -> bool {
    true
}

/// ScalerStatus records the outcome of the last scaling pass
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalerStatus {
    /// Period that produced the last scaling pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period: Option<CurrentPeriod>,

    /// Free-text diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Persisted identity and per-item outcome of the active period
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPeriod {
    /// Period name
    #[serde(default)]
    pub name: String,

    /// Period type
    #[serde(rename = "type", default)]
    pub period_type: PeriodType,

    /// Fingerprint of the period definition (opaque)
    #[serde(default)]
    pub spec_fingerprint: String,

    /// Items converged successfully
    #[serde(default)]
    pub successful: Vec<ScalingSuccess>,

    /// Items that failed to converge
    #[serde(default)]
    pub failed: Vec<ScalingFailure>,
}

/// Successfully processed item
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSuccess {
    /// Resource kind ("vm-instances", "deployments", ...)
    pub kind: String,

    /// Item name
    pub name: String,

    /// What was done
    #[serde(default)]
    pub comment: String,
}

/// Item that could not be processed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingFailure {
    /// Resource kind
    pub kind: String,

    /// Item name ("*" when the whole kind failed)
    pub name: String,

    /// Why it failed
    #[serde(default)]
    pub reason: String,
}

impl Scaler {
    /// Whether the finalizer marker is recorded on this object
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|name| name == SCALER_FINALIZER))
    }

    /// Whether the object is being deleted
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Previously recorded period, if any
    pub fn current_period(&self) -> Option<&CurrentPeriod> {
        self.status.as_ref().and_then(|s| s.current_period.as_ref())
    }
}
