//! HTTP error mapping for API handlers.

use crate::oauth::OAuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use threadpaste_core::AppError;

/// Wrapper type for mapping core and OAuth errors into HTTP responses.
#[derive(Debug)]
pub enum HttpError {
    App(AppError),
    OAuth(OAuthError),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<OAuthError> for HttpError {
    fn from(value: OAuthError) -> Self {
        Self::OAuth(value)
    }
}

fn app_error_parts(err: AppError) -> (StatusCode, String) {
    match err {
        AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        AppError::ValidationFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        AppError::StorageMessage(msg) => {
            tracing::error!("Storage error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        }
        other => {
            tracing::error!("Internal error: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::App(err) => app_error_parts(err),
            Self::OAuth(OAuthError::NotConfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Login is not configured".to_string(),
            ),
            Self::OAuth(err) => {
                tracing::warn!("Identity provider error: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Identity provider request failed".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
