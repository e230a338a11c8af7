//! Session authentication middleware and extractors for axum.
//!
//! - `auth_middleware` validates the session token and injects the
//!   `AuthenticatedUser` into request extensions
//! - `RequireAuth` extractor rejects requests without one
//! - `session_token` finds the token in a header, cookie, or query parameter
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;

use super::super::error::{ApiError, ErrorResponse};
use super::super::state::AppState;
use crate::domain::foundation::AuthenticatedUser;

/// Finds the session token, in order: `Authorization: Bearer`, the session
/// cookie, then a `token` query parameter (browser EventSource cannot set
/// headers).
pub fn session_token(headers: &HeaderMap, uri: &Uri, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    if let Some(token) = cookie_value(headers, cookie_name) {
        return Some(token);
    }

    Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(params)| params.get("token").cloned())
        .filter(|t| !t.is_empty())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Validates the session token when sessions are configured.
///
/// Without a token the request continues unauthenticated; handlers decide
/// with `RequireAuth`. A rejected token is answered here with 401/503.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(validator) = state.sessions.clone() else {
        return next.run(request).await;
    };

    let token = session_token(request.headers(), request.uri(), &state.session_cookie);
    match token {
        Some(token) => match validator.validate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
            Err(e) => ApiError::from(e).into_response(),
        },
        None => next.run(request).await,
    }
}

/// Extractor that requires an authenticated session.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("UNAUTHENTICATED", "Authentication required")),
            )
                .into_response(),
        }
    }
}
