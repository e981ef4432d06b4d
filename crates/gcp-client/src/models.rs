//! Compute Engine API models
//!
//! Only the fields the scaler reads are modelled; everything else in the
//! API payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Paginated instance list (`instances.list`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    #[serde(default)]
    pub items: Vec<Instance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// VM instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    /// Zone URL, e.g. `https://www.googleapis.com/compute/v1/projects/p/zones/europe-west1-b`
    #[serde(default)]
    pub zone: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Instance {
    /// Zone name without the URL prefix
    pub fn zone_name(&self) -> &str {
        self.zone.rsplit('/').next().unwrap_or(&self.zone)
    }
}

/// Lifecycle status of a VM instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Provisioning,
    Staging,
    Running,
    Stopping,
    Stopped,
    Suspending,
    Suspended,
    Repairing,
    Terminated,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    /// Instance is up or on its way up
    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Provisioning | InstanceStatus::Staging | InstanceStatus::Running)
    }

    /// Instance is down and can be started
    pub fn is_stopped(&self) -> bool {
        matches!(self, InstanceStatus::Stopped | InstanceStatus::Terminated)
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Provisioning => "PROVISIONING",
            InstanceStatus::Staging => "STAGING",
            InstanceStatus::Running => "RUNNING",
            InstanceStatus::Stopping => "STOPPING",
            InstanceStatus::Stopped => "STOPPED",
            InstanceStatus::Suspending => "SUSPENDING",
            InstanceStatus::Suspended => "SUSPENDED",
            InstanceStatus::Repairing => "REPAIRING",
            InstanceStatus::Terminated => "TERMINATED",
            InstanceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Long-running zonal operation returned by start/stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

/// Errors attached to an operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_deserializes_unknown_status() {
        let json = serde_json::json!({
            "name": "vm-1",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/europe-west1-b",
            "status": "SOMETHING_NEW",
            "id": "12345"
        });
        let instance: Instance = serde_json::from_value(json).unwrap();
        assert_eq!(instance.status, InstanceStatus::Unknown);
        assert_eq!(instance.zone_name(), "europe-west1-b");
        assert!(instance.labels.is_empty());
    }

    #[test]
    fn test_instance_status_groups() {
        assert!(InstanceStatus::Staging.is_running());
        assert!(InstanceStatus::Terminated.is_stopped());
        assert!(!InstanceStatus::Stopping.is_running());
        assert!(!InstanceStatus::Stopping.is_stopped());
    }

    #[test]
    fn test_empty_instance_list() {
        let list: InstanceList = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
