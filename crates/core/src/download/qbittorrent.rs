//! qBittorrent download client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::QBittorrentConfig;

use super::{DownloadClient, DownloadClientError};

/// qBittorrent Web API client.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    require_info_hash: bool,
    /// Whether the cookie jar holds a session (cleared on auth failure).
    authenticated: RwLock<bool>,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig) -> Result<Self, DownloadClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| {
                DownloadClientError::Misconfigured(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            require_info_hash: false,
            authenticated: RwLock::new(false),
        })
    }

    pub fn with_require_info_hash(mut self, require: bool) -> Self {
        self.require_info_hash = require;
        self
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login; the session cookie is kept by the cookie jar.
    async fn login(&self) -> Result<(), DownloadClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() && body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.authenticated.write().await = true;
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(DownloadClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(DownloadClientError::AuthenticationFailed(format!(
                "Unexpected response: HTTP {} {}",
                status,
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), DownloadClientError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    fn add_form(&self, link: &str) -> multipart::Form {
        let mut form = multipart::Form::new().text("urls", link.to_string());
        if let Some(path) = &self.config.download_path {
            form = form.text("savepath", path.clone());
        }
        if let Some(category) = &self.config.category {
            form = form.text("category", category.clone());
        }
        if self.config.paused {
            // "stopped" replaced "paused" in Web API 2.11
            form = form.text("paused", "true").text("stopped", "true");
        }
        form
    }

    async fn post_add(&self, link: &str) -> Result<reqwest::Response, DownloadClientError> {
        let url = format!("{}/api/v2/torrents/add", self.base_url());
        Ok(self
            .client
            .post(&url)
            .multipart(self.add_form(link))
            .send()
            .await?)
    }
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    fn requires_info_hash(&self) -> bool {
        self.require_info_hash
    }

    async fn add(&self, link: &str) -> Result<(), DownloadClientError> {
        self.ensure_authenticated().await?;

        let mut response = self.post_add(link).await?;
        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            *self.authenticated.write().await = false;
            self.login().await?;
            response = self.post_add(link).await?;
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DownloadClientError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        if body.contains("Fails.") {
            return Err(DownloadClientError::ApiError(
                "qBittorrent rejected the torrent".to_string(),
            ));
        }

        info!(category = ?self.config.category, "Torrent added to qBittorrent");
        Ok(())
    }
}
