//! Mapping of core errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use bookhound_core::{
    AcquisitionError, AuthError, CatalogError, DownloadSettingsError, RegistryError, RequestError,
};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(message) => {
                error!(error = %message, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Validation(_) => ApiError::BadRequest(e.to_string()),
            RegistryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RegistryError::Storage(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RequestError::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
            RequestError::Database(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AcquisitionError> for ApiError {
    fn from(e: AcquisitionError) -> Self {
        match e {
            AcquisitionError::Request(inner) => inner.into(),
            AcquisitionError::InvalidCandidate { .. } => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<DownloadSettingsError> for ApiError {
    fn from(e: DownloadSettingsError) -> Self {
        match e {
            DownloadSettingsError::Invalid(_) => ApiError::BadRequest(e.to_string()),
            DownloadSettingsError::Storage(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InsufficientTrust { .. } => ApiError::Forbidden(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}
