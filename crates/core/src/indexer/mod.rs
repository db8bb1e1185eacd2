//! Indexer registry: which indexers exist, how they are configured and
//! which of them are searched.

mod catalog;
mod registry;
mod types;
mod watcher;

pub use catalog::{
    FieldSpec, FieldType, IndexerDefinition, IndexerKind, CATEGORY_FIELD, DEFAULT_CATEGORY,
    DEFAULT_PRIORITY, ENABLED_FIELD, PRIORITY_FIELD, PROWLARR_ID_FIELD,
};
pub use registry::IndexerRegistry;
pub use types::{ConfiguredField, IndexerConfig, SettingValue};
pub use watcher::{ApplyReport, IndexerFileWatcher};

use thiserror::Error;

use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid indexer settings: {0}")]
    Validation(String),

    #[error("Unknown indexer: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] SettingsError),
}
