//! Mock GcpClient for unit testing
//!
//! This module provides a mock implementation of GcpComputeTrait that can be used
//! in unit tests without talking to Google Cloud. Instances live in memory;
//! start/stop flip their status immediately.

use crate::error::GcpError;
use crate::gcp_trait::GcpComputeTrait;
use crate::models::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock Compute client for testing
#[derive(Clone, Default)]
pub struct MockGcpClient {
    // (zone, name) -> instance
    pub(crate) instances: Arc<Mutex<HashMap<(String, String), Instance>>>,
    // Instance names whose start/stop calls fail
    pub(crate) failing_instances: Arc<Mutex<HashSet<String>>>,
    // Zones whose list call fails
    pub(crate) failing_zones: Arc<Mutex<HashSet<String>>>,
    // Recorded "action:zone/name" calls, in order
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for MockGcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGcpClient").finish_non_exhaustive()
    }
}

impl MockGcpClient {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance to the mock store (for test setup)
    pub fn add_instance(&self, zone: &str, name: &str, status: InstanceStatus, labels: &[(&str, &str)]) {
        let instance = Instance {
            name: name.to_string(),
            zone: format!("https://www.googleapis.com/compute/v1/projects/mock/zones/{}", zone),
            status,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        };
        self.instances
            .lock()
            .unwrap()
            .insert((zone.to_string(), name.to_string()), instance);
    }

    /// Make start/stop calls for this instance fail
    pub fn fail_instance(&self, name: &str) {
        self.failing_instances.lock().unwrap().insert(name.to_string());
    }

    /// Make list calls for this zone fail
    pub fn fail_zone(&self, zone: &str) {
        self.failing_zones.lock().unwrap().insert(zone.to_string());
    }

    /// Current status of an instance
    pub fn status_of(&self, zone: &str, name: &str) -> Option<InstanceStatus> {
        self.instances
            .lock()
            .unwrap()
            .get(&(zone.to_string(), name.to_string()))
            .map(|i| i.status)
    }

    /// Recorded start/stop calls
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn transition(&self, zone: &str, name: &str, action: &str, status: InstanceStatus) -> Result<Operation, GcpError> {
        self.calls.lock().unwrap().push(format!("{}:{}/{}", action, zone, name));
        if self.failing_instances.lock().unwrap().contains(name) {
            return Err(GcpError::Api(format!("mock failure for {}", name)));
        }
        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .get_mut(&(zone.to_string(), name.to_string()))
            .ok_or_else(|| GcpError::NotFound(format!("instance {}/{} not found", zone, name)))?;
        instance.status = status;
        Ok(Operation {
            name: format!("operation-{}-{}", action, name),
            status: "DONE".to_string(),
            target_link: None,
            error: None,
        })
    }
}

/// Evaluate the subset of filter syntax produced by `label_filter`
fn matches_filter(instance: &Instance, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.split(" AND ").all(|clause| {
        let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
        let Some((key, value)) = clause.split_once(" = ") else {
            return false;
        };
        let key = key.trim().trim_start_matches("labels.");
        let value = value.trim().trim_matches('"');
        instance.labels.get(key).map(String::as_str) == Some(value)
    })
}

#[async_trait::async_trait]
impl GcpComputeTrait for MockGcpClient {
    async fn list_instances(&self, _project: &str, zone: &str, filter: Option<&str>) -> Result<Vec<Instance>, GcpError> {
        if self.failing_zones.lock().unwrap().contains(zone) {
            return Err(GcpError::Api(format!("mock failure listing zone {}", zone)));
        }
        let instances = self.instances.lock().unwrap();
        let mut found: Vec<Instance> = instances
            .iter()
            .filter(|((z, _), instance)| z == zone && matches_filter(instance, filter))
            .map(|(_, instance)| instance.clone())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn start_instance(&self, _project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.transition(zone, name, "start", InstanceStatus::Running)
    }

    async fn stop_instance(&self, _project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.transition(zone, name, "stop", InstanceStatus::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::label_filter;

    #[tokio::test]
    async fn test_mock_list_filters_by_zone_and_labels() {
        let mock = MockGcpClient::new();
        mock.add_instance("zone-a", "vm-1", InstanceStatus::Running, &[("env", "dev")]);
        mock.add_instance("zone-a", "vm-2", InstanceStatus::Running, &[("env", "prod")]);
        mock.add_instance("zone-b", "vm-3", InstanceStatus::Running, &[("env", "dev")]);

        let labels: BTreeMap<String, String> = [("env".to_string(), "dev".to_string())].into();
        let filter = label_filter(&labels);
        let found = mock.list_instances("p", "zone-a", filter.as_deref()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "vm-1");
    }

    #[tokio::test]
    async fn test_mock_stop_and_failure() {
        let mock = MockGcpClient::new();
        mock.add_instance("zone-a", "vm-1", InstanceStatus::Running, &[]);
        mock.add_instance("zone-a", "vm-2", InstanceStatus::Running, &[]);
        mock.fail_instance("vm-2");

        mock.stop_instance("p", "zone-a", "vm-1").await.unwrap();
        assert_eq!(mock.status_of("zone-a", "vm-1"), Some(InstanceStatus::Terminated));
        assert!(mock.stop_instance("p", "zone-a", "vm-2").await.is_err());
        assert_eq!(mock.calls(), vec!["stop:zone-a/vm-1", "stop:zone-a/vm-2"]);
    }
}
