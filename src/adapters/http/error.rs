//! HTTP error responses for the non-webhook routes.
//!
//! Webhook receivers never use these; they always acknowledge with 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::foundation::AuthError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ErrorResponse {
    pub fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// A backing store could not serve the request.
    Unavailable(&'static str),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(AuthError::ServiceUnavailable(msg)) => {
                tracing::error!("Auth service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("AUTH_UNAVAILABLE", "Authentication service unavailable"),
                )
            }
            ApiError::Auth(AuthError::MissingToken) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHENTICATED", "Authentication required"),
            ),
            ApiError::Auth(AuthError::TokenExpired) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("AUTH_ERROR", "Token expired"),
            ),
            ApiError::Auth(AuthError::InvalidToken) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("AUTH_ERROR", "Invalid token"),
            ),
            ApiError::Unavailable(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("UNAVAILABLE", format!("{} unavailable", what)),
            ),
        };

        (status, Json(body)).into_response()
    }
}
