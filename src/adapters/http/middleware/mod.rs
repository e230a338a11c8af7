//! HTTP middleware.
//!
//! - `auth` - Session token validation and the `RequireAuth` extractor
//! - `entitlement` - `402 Payment Required` for tenants without entitlement

pub mod auth;
pub mod entitlement;

pub use auth::{auth_middleware, session_token, AuthRejection, RequireAuth};
pub use entitlement::require_entitlement;
