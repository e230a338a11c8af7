//! Authentication types for the domain layer.
//!
//! These types represent an authenticated platform session. Any session
//! issuer can populate them via the `SessionValidator` port.

use super::TenantId;
use thiserror::Error;

/// Authenticated session extracted from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The user identifier from the token subject.
    pub user_id: String,

    /// Tenant the session is scoped to.
    pub tenant_id: TenantId,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(user_id: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id,
        }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token was presented.
    #[error("Authentication required")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The session validator could not complete the check.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if the client should obtain a new session.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}
