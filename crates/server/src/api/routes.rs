use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, indexers, requests, search, settings};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Indexers
        .route("/indexers", get(indexers::list_indexers))
        .route("/indexers/configurations", get(indexers::get_configurations))
        .route(
            "/indexers/{name}",
            get(indexers::get_indexer).patch(indexers::patch_indexer),
        )
        // Search
        .route("/search", post(search::search))
        // Book requests
        .route(
            "/requests",
            post(requests::create_request).get(requests::list_requests),
        )
        .route("/requests/{id}", get(requests::get_request))
        .route("/requests/{id}/approve", post(requests::approve_request))
        .route("/requests/{id}/retry", post(requests::retry_request))
        // Download settings
        .route(
            "/settings/download",
            get(settings::get_download_settings)
                .put(settings::put_download_settings)
                .delete(settings::reset_download_settings),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
