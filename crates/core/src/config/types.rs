use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::acquisition::DownloadSettings;
use crate::auth::TrustLevel;
use crate::catalog::AudibleRegion;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub prowlarr: Option<ProwlarrConfig>,
    #[serde(default)]
    pub download_client: Option<DownloadClientConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub indexer_file: Option<IndexerFileConfig>,
    /// Initial download settings. Values saved through the API take precedence.
    #[serde(default)]
    pub download: DownloadSettings,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Trust level granted to every caller when `method = "none"`.
    #[serde(default)]
    pub anonymous_trust: TrustLevel,
    /// Keys accepted when `method = "api_key"`.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

/// A single API key and the user it authenticates as.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user: String,
    #[serde(default)]
    pub trust: TrustLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bookhound.db")
}

/// Prowlarr search proxy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProwlarrConfig {
    /// Prowlarr server URL (e.g., "http://localhost:9696")
    pub url: String,
    /// Prowlarr API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum results requested per indexer (default: 100)
    #[serde(default = "default_search_limit")]
    pub limit: u32,
    /// How long search results stay cached, in seconds (default: 300)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_timeout() -> u32 {
    30
}

fn default_search_limit() -> u32 {
    100
}

fn default_cache_ttl() -> u64 {
    300
}

/// Download client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadClientConfig {
    pub backend: DownloadClientBackend,
    /// Refuse links whose info hash cannot be determined before dispatch.
    #[serde(default)]
    pub require_info_hash: bool,
    /// qBittorrent-specific configuration (required when backend = "qbittorrent")
    #[serde(default)]
    pub qbittorrent: Option<QBittorrentConfig>,
}

/// Available download client backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadClientBackend {
    #[serde(rename = "qbittorrent")]
    QBittorrent,
}

/// qBittorrent Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Category assigned to added torrents
    #[serde(default)]
    pub category: Option<String>,
    /// Save path for added torrents (client default when unset)
    #[serde(default)]
    pub download_path: Option<String>,
    /// Add torrents in paused state
    #[serde(default)]
    pub paused: bool,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Book metadata catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub region: AudibleRegion,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_audimeta_url")]
    pub audimeta_url: String,
    #[serde(default = "default_audnexus_url")]
    pub audnexus_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            region: AudibleRegion::default(),
            timeout_secs: default_catalog_timeout(),
            audimeta_url: default_audimeta_url(),
            audnexus_url: default_audnexus_url(),
        }
    }
}

fn default_catalog_timeout() -> u32 {
    10
}

fn default_audimeta_url() -> String {
    "https://audimeta.de".to_string()
}

fn default_audnexus_url() -> String {
    "https://api.audnex.us".to_string()
}

/// Watched indexer settings file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerFileConfig {
    pub path: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prowlarr: Option<SanitizedProwlarrConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_client: Option<SanitizedDownloadClientConfig>,
    pub catalog: CatalogConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer_file: Option<IndexerFileConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub anonymous_trust: TrustLevel,
    pub api_keys_configured: usize,
}

/// Sanitized Prowlarr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProwlarrConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub limit: u32,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloadClientConfig {
    pub backend: String,
    pub require_info_hash: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbittorrent: Option<SanitizedQBittorrentConfig>,
}

/// Sanitized qBittorrent config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub category: Option<String>,
    pub download_path: Option<String>,
    pub paused: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                anonymous_trust: config.auth.anonymous_trust,
                api_keys_configured: config.auth.api_keys.len(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            prowlarr: config.prowlarr.as_ref().map(|p| SanitizedProwlarrConfig {
                url: p.url.clone(),
                api_key_configured: !p.api_key.is_empty(),
                timeout_secs: p.timeout_secs,
                limit: p.limit,
                cache_ttl_secs: p.cache_ttl_secs,
            }),
            download_client: config
                .download_client
                .as_ref()
                .map(|d| SanitizedDownloadClientConfig {
                    backend: match d.backend {
                        DownloadClientBackend::QBittorrent => "qbittorrent".to_string(),
                    },
                    require_info_hash: d.require_info_hash,
                    qbittorrent: d.qbittorrent.as_ref().map(|q| SanitizedQBittorrentConfig {
                        url: q.url.clone(),
                        username: q.username.clone(),
                        password_configured: !q.password.is_empty(),
                        category: q.category.clone(),
                        download_path: q.download_path.clone(),
                        paused: q.paused,
                    }),
                }),
            catalog: config.catalog.clone(),
            indexer_file: config.indexer_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.auth.anonymous_trust, TrustLevel::Untrusted);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path, PathBuf::from("bookhound.db"));
        assert!(config.prowlarr.is_none());
        assert!(config.download_client.is_none());
        assert!(config.indexer_file.is_none());
        assert_eq!(config.catalog.region, AudibleRegion::Us);
        assert!(!config.download.auto_download.enabled);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
method = "api_key"

[[auth.api_keys]]
key = "admin-key"
user = "alice"
trust = "admin"

[[auth.api_keys]]
key = "guest-key"
user = "bob"

[prowlarr]
url = "http://localhost:9696"
api_key = "secret"

[download_client]
backend = "qbittorrent"
require_info_hash = true

[download_client.qbittorrent]
url = "http://localhost:8081"
username = "admin"
password = "adminadmin"
category = "audiobooks"

[catalog]
region = "uk"

[indexer_file]
path = "/config/indexers.json"

[download.auto_download]
enabled = true
min_score = 2.5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.auth.api_keys.len(), 2);
        assert_eq!(config.auth.api_keys[0].trust, TrustLevel::Admin);
        assert_eq!(config.auth.api_keys[1].trust, TrustLevel::Untrusted);

        let prowlarr = config.prowlarr.unwrap();
        assert_eq!(prowlarr.timeout_secs, 30);
        assert_eq!(prowlarr.limit, 100);
        assert_eq!(prowlarr.cache_ttl_secs, 300);

        let download_client = config.download_client.unwrap();
        assert_eq!(download_client.backend, DownloadClientBackend::QBittorrent);
        assert!(download_client.require_info_hash);
        let qbit = download_client.qbittorrent.unwrap();
        assert_eq!(qbit.category.as_deref(), Some("audiobooks"));
        assert!(!qbit.paused);

        assert_eq!(config.catalog.region, AudibleRegion::Uk);
        assert_eq!(config.indexer_file.unwrap().poll_interval_secs, 5);
        assert!(config.download.auto_download.enabled);
        assert_eq!(config.download.auto_download.min_score, 2.5);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[auth]
method = "api_key"

[[auth.api_keys]]
key = "super-secret"
user = "alice"

[prowlarr]
url = "http://localhost:9696"
api_key = "prowlarr-secret"

[download_client]
backend = "qbittorrent"

[download_client.qbittorrent]
url = "http://localhost:8081"
username = "admin"
password = "qbit-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(!json.contains("super-secret"));
        assert!(!json.contains("prowlarr-secret"));
        assert!(!json.contains("qbit-secret"));
        assert_eq!(sanitized.auth.method, "api_key");
        assert_eq!(sanitized.auth.api_keys_configured, 1);
        assert!(sanitized.prowlarr.unwrap().api_key_configured);
        assert!(
            sanitized
                .download_client
                .unwrap()
                .qbittorrent
                .unwrap()
                .password_configured
        );
    }
}
