//! Compute Engine instance mutator
//!
//! - `down`: stop running instances
//! - `up` / `restore`: start stopped or terminated instances
//! - `noaction`: touch nothing
//!
//! Success comments name the resulting state ("stopped", "running"), so an
//! instance that was already there reports the same entry as one that was
//! just converged. Instances in any other state (stopping, suspended,
//! repairing) are left alone and reported as failures.

use super::{ResourceMutator, ScalingReport};
use crate::context::with_cancel;
use crate::error::ScalerError;
use crds::{GcpResources, PeriodType};
use gcp_client::{label_filter, GcpComputeTrait, Instance};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct GcpInstances {
    client: Arc<dyn GcpComputeTrait>,
    kind: String,
    selection: GcpResources,
}

impl GcpInstances {
    pub fn new(client: Arc<dyn GcpComputeTrait>, kind: &str, selection: GcpResources) -> Self {
        Self {
            client,
            kind: kind.to_string(),
            selection,
        }
    }

    fn selected(&self, instance: &Instance) -> bool {
        self.selection.names.is_empty() || self.selection.names.iter().any(|name| *name == instance.name)
    }

    async fn converge(
        &self,
        zone: &str,
        instance: &Instance,
        target: PeriodType,
        cancel: &CancellationToken,
        report: &mut ScalingReport,
    ) {
        let project = &self.selection.project_id;
        let item = format!("{}/{}", zone, instance.name);

        let (state, result) = match target {
            PeriodType::Down if instance.status.is_running() => {
                ("stopped", with_cancel(cancel, self.client.stop_instance(project, zone, &instance.name)).await)
            }
            PeriodType::Up | PeriodType::Restore if instance.status.is_stopped() => {
                ("running", with_cancel(cancel, self.client.start_instance(project, zone, &instance.name)).await)
            }
            PeriodType::Down if instance.status.is_stopped() => {
                debug!("Instance {} already {}", item, instance.status);
                report.succeeded(&self.kind, item, "stopped");
                return;
            }
            PeriodType::Up | PeriodType::Restore if instance.status.is_running() => {
                debug!("Instance {} already {}", item, instance.status);
                report.succeeded(&self.kind, item, "running");
                return;
            }
            _ => {
                // Transitional states are not a converged result
                debug!("Instance {} is {}, leaving it", item, instance.status);
                report.failed(&self.kind, item, format!("in transition ({})", instance.status));
                return;
            }
        };

        match result {
            Ok(operation) => {
                info!("Instance {} now {} (operation {})", item, state, operation.name);
                report.succeeded(&self.kind, item, state);
            }
            Err(e) => {
                warn!("Failed to converge instance {}: {}", item, e);
                report.failed(&self.kind, item, e.to_string());
            }
        }
    }
}

#[async_trait::async_trait]
impl ResourceMutator for GcpInstances {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn set_state(&self, target: PeriodType, cancel: &CancellationToken) -> Result<ScalingReport, ScalerError> {
        let mut report = ScalingReport::default();
        if target == PeriodType::NoAction {
            return Ok(report);
        }
        if self.selection.project_id.is_empty() {
            return Err(ScalerError::InvalidConfig("gcp.projectId must be set".to_string()));
        }
        if self.selection.zones.is_empty() {
            return Err(ScalerError::InvalidConfig("gcp.zones must not be empty".to_string()));
        }

        let filter = label_filter(&self.selection.label_selector);
        let mut seen = BTreeSet::new();

        for zone in &self.selection.zones {
            let instances = match with_cancel(
                cancel,
                self.client.list_instances(&self.selection.project_id, zone, filter.as_deref()),
            )
            .await
            {
                Ok(instances) => instances,
                Err(e) => {
                    warn!("Failed to list instances in {}: {}", zone, e);
                    report.failed(&self.kind, format!("{}/*", zone), e.to_string());
                    continue;
                }
            };

            for instance in instances.iter().filter(|i| self.selected(i)) {
                seen.insert(instance.name.clone());
                self.converge(zone, instance, target, cancel, &mut report).await;
            }
        }

        for name in &self.selection.names {
            if !seen.contains(name) {
                report.failed(&self.kind, name.clone(), "instance not found in any selected zone");
            }
        }

        Ok(report)
    }
}
