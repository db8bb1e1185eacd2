//! SQLite-backed settings store implementation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::warn;

use super::{SettingsError, SettingsStore};
use crate::indexer::{IndexerConfig, IndexerKind, SettingValue};

/// SQLite-backed settings store.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    /// Create a new SQLite settings store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, SettingsError> {
        let conn = Connection::open(path).map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite settings store (useful for testing).
    pub fn in_memory() -> Result<Self, SettingsError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS indexer_settings (
                name TEXT PRIMARY KEY,
                enabled INTEGER NOT NULL DEFAULT 0,
                settings TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load_indexers(&self) -> Result<Vec<IndexerConfig>, SettingsError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT name, enabled, settings FROM indexer_settings ORDER BY name")
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        let mut configs = Vec::new();
        for row in rows {
            let (name, enabled, settings_json) =
                row.map_err(|e| SettingsError::Database(e.to_string()))?;

            // Indexer types can disappear between releases
            let Some(kind) = IndexerKind::from_name(&name) else {
                warn!(indexer = %name, "Ignoring stored settings for unknown indexer");
                continue;
            };

            let settings: BTreeMap<String, SettingValue> = serde_json::from_str(&settings_json)
                .map_err(|e| SettingsError::Corrupt {
                    key: name.clone(),
                    message: e.to_string(),
                })?;

            configs.push(IndexerConfig {
                kind,
                enabled,
                settings,
            });
        }

        Ok(configs)
    }

    fn save_indexer(&self, config: &IndexerConfig) -> Result<(), SettingsError> {
        let conn = self.conn.lock().unwrap();

        let settings_json = serde_json::to_string(&config.settings)
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO indexer_settings (name, enabled, settings, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET enabled = excluded.enabled, settings = excluded.settings, updated_at = excluded.updated_at",
            params![
                config.name(),
                config.enabled,
                settings_json,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT value FROM app_settings WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SettingsError::Database(e.to_string())),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO app_settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SettingsError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM app_settings WHERE key = ?", params![key])
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteSettingsStore {
        SqliteSettingsStore::in_memory().unwrap()
    }

    #[test]
    fn test_empty_store() {
        let store = create_test_store();
        assert!(store.load_indexers().unwrap().is_empty());
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_save_and_load_indexer() {
        let store = create_test_store();

        let mut config = IndexerConfig::new(IndexerKind::AudioBookBay);
        config.enabled = true;
        config
            .settings
            .insert("prowlarr_indexer_id".to_string(), SettingValue::Int(4));
        config
            .settings
            .insert("magnet_only".to_string(), SettingValue::Bool(false));
        store.save_indexer(&config).unwrap();

        let loaded = store.load_indexers().unwrap();
        assert_eq!(loaded, vec![config]);
    }

    #[test]
    fn test_save_indexer_replaces_previous() {
        let store = create_test_store();

        let mut config = IndexerConfig::new(IndexerKind::Torznab);
        config
            .settings
            .insert("minimum_seeders".to_string(), SettingValue::Int(3));
        store.save_indexer(&config).unwrap();

        config.settings.clear();
        config.enabled = false;
        store.save_indexer(&config).unwrap();

        let loaded = store.load_indexers().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].settings.is_empty());
    }

    #[test]
    fn test_unknown_indexer_rows_are_skipped() {
        let store = create_test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO indexer_settings (name, enabled, settings, updated_at) VALUES ('Gone', 1, '{}', '')",
                [],
            )
            .unwrap();
        }
        assert!(store.load_indexers().unwrap().is_empty());
    }

    #[test]
    fn test_app_settings_put_get_delete() {
        let store = create_test_store();

        store.put("download", r#"{"a":1}"#).unwrap();
        assert_eq!(store.get("download").unwrap().as_deref(), Some(r#"{"a":1}"#));

        store.put("download", r#"{"a":2}"#).unwrap();
        assert_eq!(store.get("download").unwrap().as_deref(), Some(r#"{"a":2}"#));

        store.delete("download").unwrap();
        assert_eq!(store.get("download").unwrap(), None);
        store.delete("download").unwrap();
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("settings.db");

        {
            let store = SqliteSettingsStore::new(&db_path).unwrap();
            let mut config = IndexerConfig::new(IndexerKind::MyAnonamouse);
            config.enabled = true;
            config
                .settings
                .insert("prowlarr_indexer_id".to_string(), SettingValue::Int(1));
            store.save_indexer(&config).unwrap();
        }

        let store = SqliteSettingsStore::new(&db_path).unwrap();
        let loaded = store.load_indexers().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].enabled);
    }
}
