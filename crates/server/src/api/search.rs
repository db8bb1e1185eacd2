//! Search API handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use bookhound_core::{rank, RankContext, RankedResult, SearchQuery, TrustLevel};

use super::error::ApiError;
use super::middleware::Caller;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub indexers: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Book title to rank against (defaults to the query).
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: SearchQuery,
    pub results: Vec<RankedResult>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub indexer_errors: HashMap<String, String>,
    pub from_cache: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/search
///
/// Search all enabled indexers and rank the results with the current
/// download settings.
pub async fn search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    caller.require(TrustLevel::Trusted)?;

    let searcher = state
        .searcher()
        .ok_or_else(|| ApiError::Unavailable("Search backend not configured".to_string()))?;

    if body.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query cannot be empty".to_string()));
    }

    // The limit applies to the ranked list, so every result is fetched.
    let query = SearchQuery {
        query: body.query.clone(),
        indexers: body.indexers,
        limit: None,
    };
    let outcome = searcher.search(&query).await;

    let settings = state.download_settings().current().await;
    let context = RankContext {
        title: body.title.unwrap_or(body.query),
        authors: body.authors,
        runtime_minutes: body.runtime_minutes,
        indexer_priorities: state.registry().priorities().await,
    };
    let mut results = rank(outcome.results, &settings.ranking, &context);
    if let Some(limit) = body.limit {
        results.truncate(limit as usize);
    }

    info!(
        user = %caller.0.user_id,
        query = %query.query,
        results = results.len(),
        failed_indexers = outcome.indexer_errors.len(),
        "Search executed"
    );

    Ok(Json(SearchResponse {
        query: SearchQuery {
            limit: body.limit,
            ..query
        },
        results,
        duration_ms: outcome.duration_ms,
        indexer_errors: outcome.indexer_errors,
        from_cache: outcome.from_cache,
    }))
}
