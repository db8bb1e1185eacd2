//! Indexer configuration API handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use bookhound_core::indexer::ConfiguredField;
use bookhound_core::{IndexerConfig, TrustLevel};

use super::error::ApiError;
use super::middleware::Caller;
use crate::state::AppState;

/// GET /api/indexers/configurations
///
/// Every known indexer type with its fields and current values.
pub async fn get_configurations(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<BTreeMap<String, Vec<ConfiguredField>>>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    Ok(Json(state.registry().get_configurations().await))
}

/// GET /api/indexers
pub async fn list_indexers(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<IndexerConfig>>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    Ok(Json(state.registry().list().await))
}

/// GET /api/indexers/{name}
pub async fn get_indexer(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(name): Path<String>,
) -> Result<Json<IndexerConfig>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    Ok(Json(state.registry().get(&name).await?))
}

/// PATCH /api/indexers/{name}
///
/// Body is a JSON object of field values. Nothing is applied unless every
/// key is valid.
pub async fn patch_indexer(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    caller.require(TrustLevel::Admin)?;

    let values = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(values)) => values,
        Ok(_) => {
            return Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ))
        }
        Err(e) => return Err(ApiError::BadRequest(format!("Invalid JSON: {}", e))),
    };

    let updated = state.registry().patch(&name, &values).await?;
    info!(
        indexer = %name,
        user = %caller.0.user_id,
        enabled = updated.enabled,
        "Indexer settings updated"
    );

    Ok(StatusCode::NO_CONTENT)
}
