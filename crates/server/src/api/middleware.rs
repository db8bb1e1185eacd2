//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bookhound_core::{AuthError, AuthRequest, Identity, TrustLevel};

use super::error::ApiError;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware that validates requests using the configured authenticator.
///
/// On success the caller's [`Identity`] (including its trust level) is stored
/// in the request extensions. Missing or invalid credentials return 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    // Extract headers into HashMap for AuthRequest
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    // Get source IP (default to localhost if not available)
    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::NotAuthenticated) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["not_authenticated"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::InvalidCredentials(_)) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid_credentials"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(_) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["internal_error"]).inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extractor for the authenticated caller.
///
/// Falls back to an untrusted anonymous identity if the auth middleware did
/// not run.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    /// 403 unless the caller has at least `required` trust.
    pub fn require(&self, required: TrustLevel) -> Result<(), ApiError> {
        self.0.require(required).map_err(|e| {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["insufficient_trust"])
                .inc();
            ApiError::from(e)
        })
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_else(Identity::anonymous);
        std::future::ready(Ok(Caller(identity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        middleware,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use bookhound_core::auth::ApiKeyAuthenticator;
    use bookhound_core::config::{ApiKeyEntry, AuthConfig, AuthMethod};
    use bookhound_core::{
        Authenticator, Config, DownloadSettings, DownloadSettingsManager, IndexerRegistry,
        NoneAuthenticator, SqliteRequestStore, SqliteSettingsStore,
    };
    use tower::ServiceExt;

    async fn admin_only(caller: Caller) -> Result<String, ApiError> {
        caller.require(TrustLevel::Admin)?;
        Ok(caller.0.user_id)
    }

    fn test_config() -> Config {
        bookhound_core::load_config_from_str("[auth]\nmethod = \"none\"\n").unwrap()
    }

    fn create_test_state(authenticator: Arc<dyn Authenticator>) -> Arc<AppState> {
        let settings_store = Arc::new(SqliteSettingsStore::in_memory().unwrap());
        let registry = Arc::new(IndexerRegistry::new(settings_store.clone()).unwrap());
        let download_settings = Arc::new(
            DownloadSettingsManager::new(settings_store, DownloadSettings::default()).unwrap(),
        );

        Arc::new(AppState::new(
            test_config(),
            authenticator,
            registry,
            Arc::new(SqliteRequestStore::in_memory().unwrap()),
            download_settings,
            None,
            None,
            None,
        ))
    }

    fn api_key_state() -> Arc<AppState> {
        let auth = AuthConfig {
            method: AuthMethod::ApiKey,
            anonymous_trust: TrustLevel::Untrusted,
            api_keys: vec![
                ApiKeyEntry {
                    key: "admin-key".to_string(),
                    user: "root".to_string(),
                    trust: TrustLevel::Admin,
                },
                ApiKeyEntry {
                    key: "user-key".to_string(),
                    user: "alice".to_string(),
                    trust: TrustLevel::Trusted,
                },
            ],
        };
        create_test_state(Arc::new(ApiKeyAuthenticator::new(auth.api_keys)))
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(admin_only))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn status_for(state: Arc<AppState>, key: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/test");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        app(state)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_none_auth_uses_configured_trust() {
        let untrusted = create_test_state(Arc::new(NoneAuthenticator::new()));
        assert_eq!(status_for(untrusted, None).await, StatusCode::FORBIDDEN);

        let admin = create_test_state(Arc::new(NoneAuthenticator::with_trust(TrustLevel::Admin)));
        assert_eq!(status_for(admin, None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_key_auth() {
        assert_eq!(
            status_for(api_key_state(), Some("admin-key")).await,
            StatusCode::OK
        );
        assert_eq!(
            status_for(api_key_state(), Some("user-key")).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(api_key_state(), Some("wrong-key")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(api_key_state(), None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_x_api_key_header() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "admin-key")
            .body(Body::empty())
            .unwrap();
        let response = app(api_key_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_caller_without_middleware_is_anonymous() {
        let app: Router = Router::new().route(
            "/whoami",
            get(|caller: Caller| async move { caller.0.user_id.into_response() }),
        );
        let response = app
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
