//! Book request API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bookhound_core::{
    AudibleRegion, Book, BookRequest, NewRequest, RequestFilter, TrustLevel,
};

use super::error::ApiError;
use super::middleware::Caller;
use crate::metrics::{ADMIN_ACTIONS_TOTAL, BOOK_REQUESTS_CREATED};
use crate::state::AppState;

/// Maximum allowed limit for request queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for request queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a book request.
///
/// Either `book` is given in full, or `asin` is looked up in the catalog.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    #[serde(default)]
    pub asin: Option<String>,
    /// Catalog region for the lookup (defaults to the configured region)
    #[serde(default)]
    pub region: Option<AudibleRegion>,
    #[serde(default)]
    pub book: Option<Book>,
}

/// Query parameters for listing requests
#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    /// Filter by state type
    pub state: Option<String>,
    /// Filter by requester (admins only)
    pub requester: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListRequestsResponse {
    pub requests: Vec<BookRequest>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    /// Index into the request's candidate list
    pub candidate: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/requests
///
/// Store the request and start the acquisition pipeline in the background.
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<BookRequest>), ApiError> {
    let book = match (body.book, body.asin) {
        (Some(book), _) => book,
        (None, Some(asin)) => {
            let catalog = state
                .catalog()
                .ok_or_else(|| ApiError::Unavailable("Book catalog not configured".to_string()))?;
            let region = body.region.unwrap_or_else(|| state.default_region());
            catalog.get_book(asin.trim(), region).await?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either asin or book is required".to_string(),
            ))
        }
    };

    if book.title.trim().is_empty() {
        return Err(ApiError::BadRequest("book.title cannot be empty".to_string()));
    }

    let identity = caller.0;
    let created = state.requests().create(NewRequest {
        book,
        requester: identity.user_id.clone(),
        trust: identity.trust,
    })?;
    BOOK_REQUESTS_CREATED
        .with_label_values(&[identity.trust.as_str()])
        .inc();

    info!(
        request_id = %created.id,
        user = %identity.user_id,
        trust = %identity.trust,
        title = %created.book.title,
        "Book request created"
    );

    match state.pipeline() {
        Some(pipeline) => {
            pipeline.spawn(created.id.clone());
        }
        None => warn!(
            request_id = %created.id,
            "No search backend configured, request stays pending"
        ),
    }

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/requests
///
/// Admins see every request; everyone else sees their own.
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<ListRequestsParams>,
) -> Result<Json<ListRequestsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let requester = if caller.0.is_admin() {
        params.requester
    } else {
        Some(caller.0.user_id.clone())
    };

    let filter = RequestFilter {
        requester,
        state: params.state,
        limit,
        offset,
    };
    let requests = state.requests().list(&filter)?;

    Ok(Json(ListRequestsResponse {
        requests,
        limit,
        offset,
    }))
}

/// GET /api/requests/{id}
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<BookRequest>, ApiError> {
    let request = state
        .requests()
        .get(&id)?
        // Other users' requests are reported as missing
        .filter(|r| caller.0.is_admin() || r.requester == caller.0.user_id)
        .ok_or_else(|| ApiError::NotFound(format!("Request not found: {}", id)))?;

    Ok(Json(request))
}

/// POST /api/requests/{id}/approve
///
/// Dispatch one of the candidates kept on a request awaiting approval.
pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<BookRequest>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    let pipeline = state
        .pipeline()
        .ok_or_else(|| ApiError::Unavailable("Search backend not configured".to_string()))?;

    let updated = pipeline.approve(&id, body.candidate).await?;
    ADMIN_ACTIONS_TOTAL.inc();
    info!(
        request_id = %id,
        user = %caller.0.user_id,
        state = updated.status.state_type(),
        "Request approved"
    );

    Ok(Json(updated))
}

/// POST /api/requests/{id}/retry
///
/// Put a request awaiting approval back to pending and run it again.
pub async fn retry_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<BookRequest>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    let pipeline = state
        .pipeline()
        .ok_or_else(|| ApiError::Unavailable("Search backend not configured".to_string()))?;

    let updated = pipeline.retry(&id).await?;
    ADMIN_ACTIONS_TOTAL.inc();
    info!(
        request_id = %id,
        user = %caller.0.user_id,
        state = updated.status.state_type(),
        "Request retried"
    );

    Ok(Json(updated))
}
