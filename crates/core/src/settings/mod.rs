//! Persistent settings: indexer configurations and application settings.

mod sqlite;

pub use sqlite::SqliteSettingsStore;

use thiserror::Error;

use crate::indexer::IndexerConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt stored value for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Trait for settings storage backends.
pub trait SettingsStore: Send + Sync {
    /// Load every stored indexer configuration.
    fn load_indexers(&self) -> Result<Vec<IndexerConfig>, SettingsError>;

    /// Replace the stored configuration of one indexer.
    fn save_indexer(&self, config: &IndexerConfig) -> Result<(), SettingsError>;

    /// Read an application setting (JSON encoded).
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Write an application setting (JSON encoded).
    fn put(&self, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Remove an application setting. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), SettingsError>;
}
