//! Compute Engine API client
//!
//! Implements the zonal instance endpoints used by the scaler:
//! `instances.list`, `instances.start` and `instances.stop`.

use crate::auth::{Credentials, TokenSource};
use crate::error::GcpError;
use crate::gcp_trait::GcpComputeTrait;
use crate::models::*;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

/// Compute Engine API client
pub struct GcpClient {
    client: Client,
    base_url: String,
    tokens: TokenSource,
}

impl std::fmt::Debug for GcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GcpClient {
    /// Create a new client against the public Compute Engine endpoint
    pub fn new(credentials: Credentials) -> Result<Self, GcpError> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), credentials)
    }

    /// Create a new client against a custom endpoint (emulators, proxies)
    pub fn with_base_url(base_url: String, credentials: Credentials) -> Result<Self, GcpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GcpError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: TokenSource::new(credentials),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn instances_url(&self, project: &str, zone: &str) -> Result<String, GcpError> {
        if project.is_empty() || zone.is_empty() {
            return Err(GcpError::InvalidRequest(
                "project and zone must not be empty".to_string(),
            ));
        }
        Ok(format!(
            "{}/projects/{}/zones/{}/instances",
            self.base_url, project, zone
        ))
    }

    /// List all instances in a zone, following pagination.
    ///
    /// # Arguments
    /// * `filter` - Compute API filter expression, e.g. `(labels.env = "dev")`
    pub async fn list_instances(
        &self,
        project: &str,
        zone: &str,
        filter: Option<&str>,
    ) -> Result<Vec<Instance>, GcpError> {
        let url = self.instances_url(project, zone)?;
        let token = self.tokens.token(&self.client).await?;
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            debug!("Listing instances in {}/{} (page token: {:?})", project, zone, page_token);

            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(filter) = filter {
                query.push(("filter", filter));
            }
            if let Some(page) = page_token.as_deref() {
                query.push(("pageToken", page));
            }

            let response = self.client
                .get(&url)
                .bearer_auth(&token)
                .header("Accept", "application/json")
                .query(&query)
                .send()
                .await
                .map_err(GcpError::Http)?;

            if response.status() == 404 {
                return Err(GcpError::NotFound(format!("zone {}/{} not found", project, zone)));
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(GcpError::Api(format!(
                    "Failed to list instances in {}/{}: {} - {}",
                    project, zone, status, body
                )));
            }

            let page: InstanceList = response.json().await?;
            instances.extend(page.items);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(instances)
    }

    /// Start an instance
    pub async fn start_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.instance_action(project, zone, name, "start").await
    }

    /// Stop an instance
    pub async fn stop_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.instance_action(project, zone, name, "stop").await
    }

    async fn instance_action(
        &self,
        project: &str,
        zone: &str,
        name: &str,
        action: &str,
    ) -> Result<Operation, GcpError> {
        let url = format!("{}/{}/{}", self.instances_url(project, zone)?, name, action);
        let token = self.tokens.token(&self.client).await?;
        debug!("POST {}", url);

        let response = self.client
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(GcpError::Http)?;

        if response.status() == 404 {
            return Err(GcpError::NotFound(format!("instance {}/{}/{} not found", project, zone, name)));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GcpError::Api(format!(
                "Failed to {} instance {}: {} - {}",
                action, name, status, body
            )));
        }

        let operation: Operation = response.json().await?;
        if let Some(error) = &operation.error {
            let messages: Vec<&str> = error.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(GcpError::Api(format!(
                "{} operation {} failed: {}",
                action,
                operation.name,
                messages.join("; ")
            )));
        }
        Ok(operation)
    }
}

/// Build a Compute API filter requiring every label to match.
///
/// Returns `None` for an empty selector.
pub fn label_filter(labels: &BTreeMap<String, String>) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let clauses: Vec<String> = labels
        .iter()
        .map(|(key, value)| format!("(labels.{} = \"{}\")", key, value.replace('"', "\\\"")))
        .collect();
    Some(clauses.join(" AND "))
}

#[async_trait::async_trait]
impl GcpComputeTrait for GcpClient {
    async fn list_instances(&self, project: &str, zone: &str, filter: Option<&str>) -> Result<Vec<Instance>, GcpError> {
        self.list_instances(project, zone, filter).await
    }

    async fn start_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.start_instance(project, zone, name).await
    }

    async fn stop_instance(&self, project: &str, zone: &str, name: &str) -> Result<Operation, GcpError> {
        self.stop_instance(project, zone, name).await
    }
}
