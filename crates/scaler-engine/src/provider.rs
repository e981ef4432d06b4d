//! Provider clients for the Auth stage.
//!
//! A [`ProviderConnector`] turns a Scaler's provider settings and optional
//! auth secret into a [`ProviderHandle`]: the client the resource mutators
//! act through.

use crate::error::ScalerError;
use crate::mutator::kubernetes::{KubeWorkloads, WorkloadApi};
use crds::{ProviderSpec, Scaler};
use gcp_client::{Credentials, GcpClient, GcpComputeTrait};
use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::Arc;
use tracing::{debug, info};

/// Authenticated client for one provider
#[derive(Clone)]
pub enum ProviderHandle {
    Gcp(Arc<dyn GcpComputeTrait>),
    Kubernetes(Arc<dyn WorkloadApi>),
}

impl ProviderHandle {
    pub fn provider_name(&self) -> &'static str {
        match self {
            ProviderHandle::Gcp(_) => "gcp",
            ProviderHandle::Kubernetes(_) => "kubernetes",
        }
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProviderHandle({})", self.provider_name())
    }
}

/// Builds provider clients from a Scaler's credentials
#[async_trait::async_trait]
pub trait ProviderConnector: Send + Sync {
    async fn connect(&self, scaler: &Scaler) -> Result<ProviderHandle, ScalerError>;
}

/// Connector reading auth secrets from the Scaler's namespace
#[derive(Clone)]
pub struct KubeProviderConnector {
    client: Client,
}

impl KubeProviderConnector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Contents of the referenced secret key, `None` without a reference
    async fn secret_value(&self, scaler: &Scaler) -> Result<Option<String>, ScalerError> {
        let Some(reference) = &scaler.spec.auth_secret_ref else {
            return Ok(None);
        };
        let namespace = scaler.metadata.namespace.as_deref().unwrap_or("default");
        let key = reference
            .key
            .as_deref()
            .unwrap_or_else(|| scaler.spec.provider.default_secret_key());

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets
            .get_opt(&reference.name)
            .await
            .map_err(|e| ScalerError::Auth(format!("cannot read secret {}/{}: {}", namespace, reference.name, e)))?
            .ok_or_else(|| ScalerError::Auth(format!("secret {}/{} not found", namespace, reference.name)))?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .ok_or_else(|| {
                ScalerError::Auth(format!("secret {}/{} has no key '{}'", namespace, reference.name, key))
            })?;

        String::from_utf8(bytes.0.clone())
            .map(Some)
            .map_err(|_| ScalerError::Auth(format!("secret {}/{} key '{}' is not UTF-8", namespace, reference.name, key)))
    }
}

#[async_trait::async_trait]
impl ProviderConnector for KubeProviderConnector {
    async fn connect(&self, scaler: &Scaler) -> Result<ProviderHandle, ScalerError> {
        let secret = self.secret_value(scaler).await?;

        match &scaler.spec.provider {
            ProviderSpec::Gcp(gcp) => {
                let credentials = match secret {
                    Some(json) => Credentials::from_service_account_json(&json)
                        .map_err(|e| ScalerError::Auth(e.to_string()))?,
                    None => Credentials::MetadataServer,
                };
                debug!("Connecting to GCP project {} with {:?}", gcp.project_id, credentials);
                let client = GcpClient::new(credentials).map_err(|e| ScalerError::Auth(e.to_string()))?;
                Ok(ProviderHandle::Gcp(Arc::new(client)))
            }
            ProviderSpec::Kubernetes(_) => {
                let client = match secret {
                    Some(yaml) => {
                        let kubeconfig = Kubeconfig::from_yaml(&yaml)
                            .map_err(|e| ScalerError::Auth(format!("invalid kubeconfig: {}", e)))?;
                        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                            .await
                            .map_err(|e| ScalerError::Auth(format!("invalid kubeconfig: {}", e)))?;
                        info!("Using kubeconfig from auth secret for {:?}", scaler.metadata.name);
                        Client::try_from(config)
                            .map_err(|e| ScalerError::Auth(format!("cannot build Kubernetes client: {}", e)))?
                    }
                    None => self.client.clone(),
                };
                Ok(ProviderHandle::Kubernetes(Arc::new(KubeWorkloads::new(client))))
            }
        }
    }
}
