//! Download settings API handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use bookhound_core::{DownloadSettings, TrustLevel};

use super::error::ApiError;
use super::middleware::Caller;
use crate::state::AppState;

/// GET /api/settings/download
pub async fn get_download_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<DownloadSettings>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    Ok(Json(state.download_settings().current().await))
}

/// PUT /api/settings/download
///
/// Replace the settings. Missing fields take their defaults.
pub async fn put_download_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<DownloadSettings>,
) -> Result<Json<DownloadSettings>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    let updated = state.download_settings().update(body).await?;
    info!(user = %caller.0.user_id, "Download settings replaced");
    Ok(Json(updated))
}

/// DELETE /api/settings/download
///
/// Drop the stored settings and return to the configured defaults.
pub async fn reset_download_settings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<DownloadSettings>, ApiError> {
    caller.require(TrustLevel::Admin)?;
    let defaults = state.download_settings().reset().await?;
    info!(user = %caller.0.user_id, "Download settings reset");
    Ok(Json(defaults))
}
