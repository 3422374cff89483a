//! Error types for rsd-ui

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rsd_common::{AuthError, Error};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Missing or expired session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// rsd-common error
    #[error("Common error: {0}")]
    Common(#[from] Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Common(Error::Auth(err))
    }
}

/// Status and code for a domain error
fn classify(err: &Error) -> (StatusCode, &'static str) {
    match err {
        Error::Network(_) => (StatusCode::BAD_GATEWAY, "PREDICTOR_UNREACHABLE"),
        Error::Service { .. } => (StatusCode::BAD_GATEWAY, "PREDICTOR_ERROR"),
        Error::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "PREDICTOR_MALFORMED_RESPONSE"),
        Error::OrderMismatch { .. } => (StatusCode::BAD_GATEWAY, "ORDER_MISMATCH"),
        Error::BatchAnalysis(_) => (StatusCode::BAD_GATEWAY, "BATCH_ANALYSIS_FAILED"),
        Error::EmptyInput => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::Auth(AuthError::PasswordTooShort { .. }) => {
            (StatusCode::BAD_REQUEST, "PASSWORD_TOO_SHORT")
        }
        Error::Auth(AuthError::AlreadyRegistered) => (StatusCode::CONFLICT, "ALREADY_REGISTERED"),
        Error::Auth(AuthError::Network(_)) | Error::Auth(AuthError::Provider { .. }) => {
            (StatusCode::BAD_GATEWAY, "IDENTITY_PROVIDER_ERROR")
        }
        Error::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        Error::History(_) => (StatusCode::BAD_GATEWAY, "HISTORY_UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Common(ref err) => {
                let (status, code) = classify(err);
                (status, code, err.user_message())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
