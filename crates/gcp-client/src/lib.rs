//! Google Compute Engine REST API Client
//!
//! A small client for the Compute Engine v1 API covering what a scheduled
//! scaler needs: listing instances in a zone and starting/stopping them.
//!
//! # Example
//!
//! ```no_run
//! use gcp_client::{Credentials, GcpClient, GcpComputeTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Credentials from the GCE metadata server (workload identity)
//! let client = GcpClient::new(Credentials::MetadataServer)?;
//!
//! // Stop every instance labelled env=dev in one zone
//! let filter = gcp_client::label_filter(&[("env".to_string(), "dev".to_string())].into());
//! for instance in client.list_instances("my-project", "europe-west1-b", filter.as_deref()).await? {
//!     client.stop_instance("my-project", "europe-west1-b", &instance.name).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod gcp_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use auth::{Credentials, ServiceAccountKey};
pub use client::{label_filter, GcpClient};
pub use error::GcpError;
pub use models::*;
pub use gcp_trait::GcpComputeTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockGcpClient;
