//! CloudScaler CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the CloudScaler controller.
//!
//! A `Scaler` attaches an ordered list of time windows ("periods") to a set of
//! cloud resources (GCP VM instances or Kubernetes workloads). The controller
//! drives those resources toward the state of whichever period is active.

pub mod period;
pub mod provider;
pub mod scaler;

pub use period::*;
pub use provider::*;
pub use scaler::*;

/// Finalizer recorded on a `Scaler` while cleanup is still owed
pub const SCALER_FINALIZER: &str = "cloudscaler.microscaler.io/finalizer";

/// Annotation holding a workload's replica count before it was scaled down
pub const ORIGINAL_REPLICAS_ANNOTATION: &str = "cloudscaler.microscaler.io/original-replicas";
