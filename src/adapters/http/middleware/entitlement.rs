//! Entitlement enforcement for premium routes.
//!
//! Runs after `auth_middleware`. Denied tenants get `402 Payment Required`
//! with the decision's reason.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::super::state::AppState;
use super::auth::AuthRejection;
use crate::domain::foundation::AuthenticatedUser;

pub async fn require_entitlement(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.gate.is_enabled() {
        return next.run(request).await;
    }

    let Some(user) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return AuthRejection::Unauthenticated.into_response();
    };

    let decision = state.gate.check(&user.tenant_id).await;
    if decision.allowed {
        return next.run(request).await;
    }

    tracing::debug!(tenant_id = %user.tenant_id, reason = ?decision.reason, "Entitlement denied");
    (
        StatusCode::PAYMENT_REQUIRED,
        Json(json!({
            "error": "Active subscription required",
            "code": "ENTITLEMENT_REQUIRED",
            "reason": decision.reason,
        })),
    )
        .into_response()
}
