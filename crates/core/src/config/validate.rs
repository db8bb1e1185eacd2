use std::collections::HashSet;

use super::types::{AuthMethod, Config, DownloadClientBackend};
use super::ConfigError;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - api_key auth has at least one non-empty, unique key
/// - Configured backends have their sub-sections
/// - Indexer file poll interval is not 0
/// - Download settings (weights, ranges, threshold)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey {
        if config.auth.api_keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.api_keys must contain at least one key when using api_key auth".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for entry in &config.auth.api_keys {
            if entry.key.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "auth.api_keys entry for user '{}' has an empty key",
                    entry.user
                )));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "auth.api_keys contains a duplicate key (user '{}')",
                    entry.user
                )));
            }
        }
    }

    if let Some(prowlarr) = &config.prowlarr {
        if prowlarr.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prowlarr.url cannot be empty".to_string(),
            ));
        }
    }

    if let Some(download_client) = &config.download_client {
        match download_client.backend {
            DownloadClientBackend::QBittorrent if download_client.qbittorrent.is_none() => {
                return Err(ConfigError::ValidationError(
                    "download_client.qbittorrent is required when backend = \"qbittorrent\""
                        .to_string(),
                ));
            }
            DownloadClientBackend::QBittorrent => {}
        }
    }

    if let Some(indexer_file) = &config.indexer_file {
        if indexer_file.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "indexer_file.poll_interval_secs cannot be 0".to_string(),
            ));
        }
    }

    config
        .download
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("download: {}", e)))?;

    Ok(())
}
