//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock search, download and catalog backends, so the HTTP surface can
//! be exercised without Prowlarr, qBittorrent or a metadata service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use bookhound_core::{
    create_authenticator, load_config_from_str, AcquisitionPipeline, Authenticator, BookCatalog,
    Dispatcher, DownloadClient, DownloadSettingsManager, IndexerRegistry, RequestStore, Searcher,
    SettingsStore, SqliteRequestStore, SqliteSettingsStore,
    testing::{MockBookCatalog, MockDownloadClient, MockSearcher},
};

/// Re-export fixtures for test convenience
pub use bookhound_core::testing::fixtures;

/// Key of the `root` user, trust level admin.
pub const ADMIN_KEY: &str = "admin-key";
/// Key of the `alice` user, trust level trusted.
pub const TRUSTED_KEY: &str = "trusted-key";
/// Key of the `bob` user, trust level untrusted.
pub const UNTRUSTED_KEY: &str = "untrusted-key";

/// Test fixture with an in-process router and controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_request_creation() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post_as(TRUSTED_KEY, "/api/requests", json!({
///         "book": { "asin": "B0", "title": "Dune" }
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub searcher: Arc<MockSearcher>,
    pub download_client: Arc<MockDownloadClient>,
    pub catalog: Arc<MockBookCatalog>,
    pub registry: Arc<IndexerRegistry>,
    /// Holds the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Initial value of `download.auto_download.enabled`
    pub auto_download: bool,
    /// Wire a search backend (and so the acquisition pipeline)
    pub with_searcher: bool,
    /// Wire a download client behind the dispatcher
    pub with_download_client: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            auto_download: true,
            with_searcher: true,
            with_download_client: true,
        }
    }
}

impl TestConfig {
    /// Nothing behind the API but the stores.
    pub fn bare() -> Self {
        Self {
            auto_download: false,
            with_searcher: false,
            with_download_client: false,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = load_config_from_str(&format!(
            r#"
[auth]
method = "api_key"

[[auth.api_keys]]
key = "{ADMIN_KEY}"
user = "root"
trust = "admin"

[[auth.api_keys]]
key = "{TRUSTED_KEY}"
user = "alice"
trust = "trusted"

[[auth.api_keys]]
key = "{UNTRUSTED_KEY}"
user = "bob"
trust = "untrusted"

[server]
host = "127.0.0.1"
port = 8080

[database]
path = "{}"

[download.auto_download]
enabled = {}
max_candidates = 3
"#,
            db_path.display(),
            test_config.auto_download
        ))
        .expect("Failed to parse test config");

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let settings_store: Arc<dyn SettingsStore> = Arc::new(
            SqliteSettingsStore::new(&db_path).expect("Failed to create settings store"),
        );
        let request_store: Arc<dyn RequestStore> = Arc::new(
            SqliteRequestStore::new(&db_path).expect("Failed to create request store"),
        );
        let registry = Arc::new(
            IndexerRegistry::new(Arc::clone(&settings_store)).expect("Failed to create registry"),
        );
        let download_settings = Arc::new(
            DownloadSettingsManager::new(settings_store, config.download.clone())
                .expect("Failed to create download settings"),
        );

        let searcher = Arc::new(MockSearcher::new());
        let download_client = Arc::new(MockDownloadClient::new());
        let catalog = Arc::new(MockBookCatalog::new());

        let dispatcher = test_config.with_download_client.then(|| {
            Arc::new(Dispatcher::new(
                Arc::clone(&download_client) as Arc<dyn DownloadClient>
            ))
        });

        let (state_searcher, pipeline) = if test_config.with_searcher {
            let searcher_dyn = Arc::clone(&searcher) as Arc<dyn Searcher>;
            let pipeline = Arc::new(AcquisitionPipeline::new(
                Arc::clone(&request_store),
                Arc::clone(&searcher_dyn),
                Arc::clone(&registry),
                dispatcher,
                Arc::clone(&download_settings),
            ));
            (Some(searcher_dyn), Some(pipeline))
        } else {
            (None, None)
        };

        let state = Arc::new(bookhound_server::state::AppState::new(
            config,
            authenticator,
            Arc::clone(&registry),
            request_store,
            download_settings,
            state_searcher,
            Some(Arc::clone(&catalog) as Arc<dyn BookCatalog>),
            pipeline,
        ));

        let router = bookhound_server::api::create_router(state);

        Self {
            router,
            searcher,
            download_client,
            catalog,
            registry,
            temp_dir,
        }
    }

    /// GET as the admin user.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_as(ADMIN_KEY, path).await
    }

    pub async fn get_as(&self, key: &str, path: &str) -> TestResponse {
        self.request("GET", path, Some(key), None).await
    }

    /// POST a JSON body as the admin user.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_as(ADMIN_KEY, path, body).await
    }

    pub async fn post_as(&self, key: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(key), Some(body)).await
    }

    /// PUT a JSON body as the admin user.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(ADMIN_KEY), Some(body)).await
    }

    /// PATCH a JSON body as the admin user.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.patch_as(ADMIN_KEY, path, body).await
    }

    pub async fn patch_as(&self, key: &str, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(key), Some(body)).await
    }

    /// DELETE as the admin user.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, Some(ADMIN_KEY), None).await
    }

    /// Send a raw string body as the admin user (for malformed JSON).
    pub async fn send_raw(&self, method: &str, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .header("X-API-Key", ADMIN_KEY)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request without credentials.
    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Poll a request until it reaches `state` or give up after a few seconds.
    pub async fn wait_for_state(&self, id: &str, state: &str) -> Value {
        let path = format!("/api/requests/{}", id);
        for _ in 0..100 {
            let response = self.get(&path).await;
            if response.body["status"]["state"] == state {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let last = self.get(&path).await;
        panic!(
            "request {} never reached {}, last: {}",
            id,
            state,
            serde_json::to_string_pretty(&last.body).unwrap_or_default()
        );
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
