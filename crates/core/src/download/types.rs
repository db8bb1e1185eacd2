//! Types for handing releases to a download client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to a download client.
#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Client misconfigured: {0}")]
    Misconfigured(String),
}

impl From<reqwest::Error> for DownloadClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloadClientError::Timeout
        } else if e.is_connect() {
            DownloadClientError::ConnectionFailed(e.to_string())
        } else {
            DownloadClientError::ApiError(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Rejected before any network call.
    #[error("Malformed download link: {0}")]
    MalformedLink(String),

    #[error("Download client error: {0}")]
    Client(#[from] DownloadClientError),
}

/// Proof that a release was handed to the download client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadReceipt {
    /// Download client name.
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    pub link: String,
    pub dispatched_at: DateTime<Utc>,
}

/// Trait for download client backends.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Client name for logging and receipts.
    fn name(&self) -> &str;

    /// Whether links must resolve to an info hash before they are sent.
    fn requires_info_hash(&self) -> bool {
        false
    }

    /// Add a magnet link or .torrent URL.
    async fn add(&self, link: &str) -> Result<(), DownloadClientError>;
}
