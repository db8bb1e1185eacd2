//! Download dispatch.
//!
//! This module provides a `DownloadClient` trait with a qBittorrent
//! implementation, and the `Dispatcher` that checks links before handing
//! them over.

mod dispatcher;
mod magnet;
mod qbittorrent;
mod types;

pub use dispatcher::Dispatcher;
pub use magnet::{magnet_info_hash, normalize_info_hash, LinkError};
pub use qbittorrent::QBittorrentClient;
pub use types::*;

use std::sync::Arc;

use crate::config::{DownloadClientBackend, DownloadClientConfig};

/// Build the configured download client.
pub fn create_download_client(
    config: &DownloadClientConfig,
) -> Result<Arc<dyn DownloadClient>, DownloadClientError> {
    match config.backend {
        DownloadClientBackend::QBittorrent => {
            let qb_config = config.qbittorrent.clone().ok_or_else(|| {
                DownloadClientError::Misconfigured(
                    "download_client.qbittorrent section is required".to_string(),
                )
            })?;
            let client =
                QBittorrentClient::new(qb_config)?.with_require_info_hash(config.require_info_hash);
            Ok(Arc::new(client))
        }
    }
}
