//! Credential sources and access-token caching
//!
//! Three sources are supported:
//! - a static bearer token (mostly for tests and short-lived jobs)
//! - a service-account key, exchanged for a token with a signed JWT assertion
//! - the GCE metadata server (workload identity / instance service account)

use crate::error::GcpError;
use crate::models::TokenResponse;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// OAuth scope required for instance start/stop
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Where access tokens come from
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued bearer token
    AccessToken(String),
    /// Service-account key file contents
    ServiceAccount(ServiceAccountKey),
    /// GCE metadata server
    MetadataServer,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credentials::ServiceAccount(key) => write!(f, "ServiceAccount({})", key.client_email),
            Credentials::MetadataServer => f.write_str("MetadataServer"),
        }
    }
}

impl Credentials {
    /// Parse a service-account key file (`credentials.json`).
    ///
    /// The private key is validated here so that a broken secret fails at
    /// client construction rather than on the first API call.
    pub fn from_service_account_json(json: &str) -> Result<Self, GcpError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| GcpError::Authentication(format!("invalid service account key: {}", e)))?;
        if key.key_type.as_deref().is_some_and(|t| t != "service_account") {
            return Err(GcpError::Authentication(format!(
                "unsupported credentials type '{}', expected 'service_account'",
                key.key_type.as_deref().unwrap_or_default()
            )));
        }
        EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GcpError::Authentication(format!("invalid service account private key: {}", e)))?;
        Ok(Credentials::ServiceAccount(key))
    }
}

/// Subset of a service-account key file
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Fetches and caches access tokens for one credential source
pub(crate) struct TokenSource {
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(crate) fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid token, refreshing it when close to expiry
    pub(crate) async fn token(&self, http: &Client) -> Result<String, GcpError> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if current.expires_at - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(current.token.clone());
            }
        }

        let response = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => exchange_jwt(http, key).await?,
            Credentials::MetadataServer => fetch_metadata_token(http).await?,
        };

        let token = response.access_token.clone();
        *cached = Some(CachedToken {
            token: response.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(response.expires_in),
        });
        Ok(token)
    }
}

async fn exchange_jwt(http: &Client, key: &ServiceAccountKey) -> Result<TokenResponse, GcpError> {
    debug!("Exchanging JWT assertion for {}", key.client_email);
    let now = Utc::now().timestamp();
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: COMPUTE_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + 3600,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| GcpError::Authentication(format!("invalid service account private key: {}", e)))?;
    let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| GcpError::Authentication(format!("failed to sign JWT assertion: {}", e)))?;

    let response = http
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GcpError::Authentication(format!(
            "token exchange failed: {} - {}",
            status, body
        )));
    }

    Ok(response.json().await?)
}

async fn fetch_metadata_token(http: &Client) -> Result<TokenResponse, GcpError> {
    debug!("Fetching access token from metadata server");
    let response = http
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GcpError::Authentication(format!(
            "metadata server token request failed: {} - {}",
            status, body
        )));
    }

    Ok(response.json().await?)
}
