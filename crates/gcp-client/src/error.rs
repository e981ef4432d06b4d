//! GCP client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Compute Engine API
#[derive(Debug, Error)]
pub enum GcpError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Compute Engine API returned an error
    #[error("Compute API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credentials could not be loaded or exchanged for a token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., empty project or zone)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
