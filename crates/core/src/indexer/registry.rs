//! In-memory indexer registry backed by a settings store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::catalog::{IndexerKind, ENABLED_FIELD};
use super::types::{ConfiguredField, IndexerConfig, SettingValue};
use super::RegistryError;
use crate::metrics::REGISTRY_PATCHES;
use crate::settings::SettingsStore;

/// Holds the configuration of every known indexer type.
///
/// All reads see a consistent snapshot. `patch` validates the whole body
/// before touching anything, persists, then swaps the new value in while
/// holding the write lock, so concurrent writers apply one after the other.
pub struct IndexerRegistry {
    indexers: RwLock<BTreeMap<IndexerKind, IndexerConfig>>,
    store: Arc<dyn SettingsStore>,
    generation: AtomicU64,
}

impl IndexerRegistry {
    /// Load persisted configurations. Types with nothing stored start disabled.
    pub fn new(store: Arc<dyn SettingsStore>) -> Result<Self, RegistryError> {
        let mut indexers: BTreeMap<IndexerKind, IndexerConfig> = IndexerKind::ALL
            .into_iter()
            .map(|kind| (kind, IndexerConfig::new(kind)))
            .collect();

        for stored in store.load_indexers()? {
            indexers.insert(stored.kind, stored);
        }

        let enabled = indexers.values().filter(|c| c.enabled).count();
        info!(indexers = indexers.len(), enabled, "Indexer registry loaded");

        Ok(Self {
            indexers: RwLock::new(indexers),
            store,
            generation: AtomicU64::new(0),
        })
    }

    /// Incremented on every applied change. Caches compare against it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Field declarations and current values for every indexer, enabled or not.
    pub async fn get_configurations(&self) -> BTreeMap<String, Vec<ConfiguredField>> {
        let indexers = self.indexers.read().await;
        indexers
            .values()
            .map(|config| {
                let fields = config
                    .kind
                    .definition()
                    .fields
                    .iter()
                    .map(|spec| {
                        let value = if spec.name == ENABLED_FIELD {
                            Some(SettingValue::Bool(config.enabled))
                        } else {
                            config.value(spec.name)
                        };
                        ConfiguredField::new(spec, value)
                    })
                    .collect();
                (config.name().to_string(), fields)
            })
            .collect()
    }

    pub async fn list(&self) -> Vec<IndexerConfig> {
        self.indexers.read().await.values().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Result<IndexerConfig, RegistryError> {
        let kind =
            IndexerKind::from_name(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let indexers = self.indexers.read().await;
        Ok(indexers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| IndexerConfig::new(kind)))
    }

    /// Snapshot of every enabled indexer.
    pub async fn enabled_indexers(&self) -> Vec<IndexerConfig> {
        self.indexers
            .read()
            .await
            .values()
            .filter(|c| c.enabled)
            .cloned()
            .collect()
    }

    /// Indexer name to priority setting (lower is preferred).
    pub async fn priorities(&self) -> HashMap<String, i64> {
        self.indexers
            .read()
            .await
            .values()
            .map(|c| (c.name().to_string(), c.priority()))
            .collect()
    }

    /// Update some fields of one indexer.
    ///
    /// `values` maps field names to raw JSON values. `null` clears a field
    /// back to its default. An unknown key or a value that cannot be coerced
    /// rejects the whole patch and leaves the indexer untouched.
    pub async fn patch(
        &self,
        name: &str,
        values: &Map<String, Value>,
    ) -> Result<IndexerConfig, RegistryError> {
        let result = self.apply_patch(name, values).await;
        let label = match &result {
            Ok(_) => "applied",
            Err(RegistryError::Validation(_)) => "invalid",
            Err(RegistryError::NotFound(_)) => "not_found",
            Err(RegistryError::Storage(_)) => "storage_error",
        };
        REGISTRY_PATCHES.with_label_values(&[label]).inc();
        result
    }

    async fn apply_patch(
        &self,
        name: &str,
        values: &Map<String, Value>,
    ) -> Result<IndexerConfig, RegistryError> {
        let kind =
            IndexerKind::from_name(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let definition = kind.definition();

        let mut indexers = self.indexers.write().await;
        let current = indexers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| IndexerConfig::new(kind));

        let mut updated = current.clone();
        let mut errors = Vec::new();

        for (key, raw) in values {
            let Some(spec) = definition.field(key) else {
                errors.push(format!("unknown field '{}'", key));
                continue;
            };

            if key == ENABLED_FIELD {
                match raw {
                    Value::Null => updated.enabled = false,
                    _ => match SettingValue::coerce(spec.field_type, raw) {
                        Ok(value) => updated.enabled = value.as_bool().unwrap_or(false),
                        Err(e) => errors.push(format!("{}: {}", key, e)),
                    },
                }
                continue;
            }

            match raw {
                Value::Null => {
                    updated.settings.remove(key);
                }
                _ => match SettingValue::coerce(spec.field_type, raw) {
                    Ok(value) => {
                        updated.settings.insert(key.clone(), value);
                    }
                    Err(e) => errors.push(format!("{}: {}", key, e)),
                },
            }
        }

        if updated.enabled {
            let missing = updated.missing_required();
            if !missing.is_empty() {
                errors.push(format!(
                    "cannot enable {} without {}",
                    kind,
                    missing.join(", ")
                ));
            }
        }

        if !errors.is_empty() {
            return Err(RegistryError::Validation(errors.join("; ")));
        }

        if updated == current {
            debug!(indexer = %kind, "Patch made no changes");
            return Ok(current);
        }

        self.store.save_indexer(&updated)?;
        indexers.insert(kind, updated.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            indexer = %kind,
            enabled = updated.enabled,
            generation,
            "Indexer configuration updated"
        );

        Ok(updated)
    }
}
