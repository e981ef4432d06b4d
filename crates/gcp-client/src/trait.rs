//! GcpComputeTrait for mocking
//!
//! This trait abstracts the Compute Engine client to enable mocking in unit tests.
//! The concrete GcpClient implements this trait, and tests can use mock implementations.

use crate::error::GcpError;
use crate::models::*;

/// Trait for Compute Engine instance operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait GcpComputeTrait: Send + Sync {
    /// List instances in a zone, optionally filtered (Compute API filter syntax)
    async fn list_instances(&self, project: &str, zone: &str, filter: Option<&str>) -> Result<Vec<Instance>, GcpError>;

    /// Start a stopped instance
    async fn start_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError>;

    /// Stop a running instance
    async fn stop_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError>;
}
