//! Entitlement query endpoint.

use axum::{extract::State, Json};

use super::middleware::RequireAuth;
use super::state::AppState;
use crate::domain::billing::EntitlementDecision;

/// `GET /api/entitlement` - decision for the caller's tenant.
pub async fn get_entitlement(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Json<EntitlementDecision> {
    Json(state.gate.check(&user.tenant_id).await)
}
