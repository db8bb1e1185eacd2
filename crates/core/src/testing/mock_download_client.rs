//! Mock download client for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::download::{DownloadClient, DownloadClientError};

/// Mock implementation of the DownloadClient trait.
///
/// Every add is recorded, including ones that fail, so tests can assert
/// that a link reached (or never reached) the client.
pub struct MockDownloadClient {
    adds: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<DownloadClientError>>>,
    requires_info_hash: AtomicBool,
}

impl Default for MockDownloadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDownloadClient {
    pub fn new() -> Self {
        Self {
            adds: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            requires_info_hash: AtomicBool::new(false),
        }
    }

    /// Links passed to [`DownloadClient::add`], in order.
    pub async fn recorded_adds(&self) -> Vec<String> {
        self.adds.read().await.clone()
    }

    /// Configure the next add to fail with the given error.
    pub async fn set_next_error(&self, error: DownloadClientError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_requires_info_hash(&self, required: bool) {
        self.requires_info_hash.store(required, Ordering::SeqCst);
    }
}

#[async_trait]
impl DownloadClient for MockDownloadClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn requires_info_hash(&self) -> bool {
        self.requires_info_hash.load(Ordering::SeqCst)
    }

    async fn add(&self, link: &str) -> Result<(), DownloadClientError> {
        self.adds.write().await.push(link.to_string());
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
