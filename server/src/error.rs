use std::path::PathBuf;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use twosign_shared::{ErrorResponse, InvalidRole, Role};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store at {} is unavailable: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode agreement state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    InvalidRole(#[from] InvalidRole),
    #[error("{0} has already signed")]
    AlreadySigned(Role),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors as seen by HTTP clients. Store details are logged, never returned.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Sign(SignError),
}

impl From<SignError> for ApiError {
    fn from(error: SignError) -> Self {
        ApiError::Sign(error)
    }
}

impl From<InvalidRole> for ApiError {
    fn from(error: InvalidRole) -> Self {
        ApiError::Sign(SignError::InvalidRole(error))
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Sign(SignError::Store(error))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(detail) => {
                tracing::debug!(%detail, "Rejected malformed request body");
                (StatusCode::BAD_REQUEST, "Invalid request body".to_string())
            }
            ApiError::Sign(SignError::InvalidRole(error)) => {
                tracing::debug!(%error, "Rejected sign request");
                (StatusCode::BAD_REQUEST, "Invalid role".to_string())
            }
            ApiError::Sign(error @ SignError::AlreadySigned(_)) => {
                (StatusCode::CONFLICT, error.to_string())
            }
            ApiError::Sign(SignError::Store(error)) => {
                tracing::error!(%error, "State store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
