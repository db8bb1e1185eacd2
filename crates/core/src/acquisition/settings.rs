//! Runtime-editable download settings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ranking::RankingConfig;
use crate::settings::{SettingsError, SettingsStore};

/// App settings key the download settings are stored under.
pub const DOWNLOAD_SETTINGS_KEY: &str = "download_settings";

/// When a request may be downloaded without an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDownloadConfig {
    /// Global switch. Off means every request waits for an admin.
    pub enabled: bool,
    /// Lowest top score that is downloaded automatically.
    pub min_score: f64,
    /// How many ranked candidates are kept on a request for review.
    pub max_candidates: usize,
}

impl Default for AutoDownloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_score: 1.5,
            max_candidates: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub auto_download: AutoDownloadConfig,
    pub ranking: RankingConfig,
}

impl DownloadSettings {
    /// Check the settings. The error names the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if !self.auto_download.min_score.is_finite() {
            return Err("auto_download.min_score must be a finite number".to_string());
        }
        if self.auto_download.max_candidates == 0 {
            return Err("auto_download.max_candidates must be at least 1".to_string());
        }
        self.ranking
            .validate()
            .map_err(|e| format!("ranking.{}", e))
    }
}

#[derive(Debug, Error)]
pub enum DownloadSettingsError {
    #[error("Invalid download settings: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] SettingsError),
}

/// Holds the live download settings.
///
/// Stored settings override the defaults from the config file. Resetting
/// removes the stored copy and returns to those defaults.
pub struct DownloadSettingsManager {
    store: Arc<dyn SettingsStore>,
    defaults: DownloadSettings,
    current: RwLock<DownloadSettings>,
}

impl DownloadSettingsManager {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        defaults: DownloadSettings,
    ) -> Result<Self, SettingsError> {
        let current = match store.get(DOWNLOAD_SETTINGS_KEY)? {
            Some(raw) => match serde_json::from_str::<DownloadSettings>(&raw) {
                Ok(stored) if stored.validate().is_ok() => stored,
                Ok(_) | Err(_) => {
                    warn!("Stored download settings are unusable, using configured defaults");
                    defaults.clone()
                }
            },
            None => defaults.clone(),
        };

        Ok(Self {
            store,
            defaults,
            current: RwLock::new(current),
        })
    }

    pub async fn current(&self) -> DownloadSettings {
        self.current.read().await.clone()
    }

    /// Validate, persist and apply new settings.
    pub async fn update(
        &self,
        settings: DownloadSettings,
    ) -> Result<DownloadSettings, DownloadSettingsError> {
        settings.validate().map_err(DownloadSettingsError::Invalid)?;

        let raw = serde_json::to_string(&settings)
            .map_err(|e| DownloadSettingsError::Invalid(e.to_string()))?;

        let mut current = self.current.write().await;
        self.store.put(DOWNLOAD_SETTINGS_KEY, &raw)?;
        *current = settings.clone();

        info!(
            auto_download = settings.auto_download.enabled,
            min_score = settings.auto_download.min_score,
            "Download settings updated"
        );
        Ok(settings)
    }

    /// Drop the stored settings and return to the configured defaults.
    pub async fn reset(&self) -> Result<DownloadSettings, DownloadSettingsError> {
        let mut current = self.current.write().await;
        self.store.delete(DOWNLOAD_SETTINGS_KEY)?;
        *current = self.defaults.clone();
        info!("Download settings reset to defaults");
        Ok(self.defaults.clone())
    }
}
