//! EntitlementGate - read-time feature access check.
//!
//! Never raises. A lapsed grace period is denied immediately and corrected
//! in the store by a detached task, guarded so it only applies while the
//! row is still in `grace_period`.

use std::sync::Arc;

use crate::domain::billing::{evaluate, DecisionReason, EntitlementDecision};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::EntitlementRepository;

#[derive(Clone)]
pub struct EntitlementGate {
    entitlements: Arc<dyn EntitlementRepository>,
    enabled: bool,
}

impl EntitlementGate {
    /// `enabled = false` allows every tenant.
    pub fn new(entitlements: Arc<dyn EntitlementRepository>, enabled: bool) -> Self {
        Self {
            entitlements,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decides whether the tenant may use premium features.
    pub async fn check(&self, tenant_id: &TenantId) -> EntitlementDecision {
        if !self.enabled {
            return EntitlementDecision::allow_because(DecisionReason::EntitlementDisabled);
        }

        let row = match self.entitlements.find(tenant_id).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Entitlement read failed, denying");
                return EntitlementDecision::deny(DecisionReason::Unavailable);
            }
        };

        let now = Timestamp::now();
        let evaluation = evaluate(row.as_ref(), now);
        if evaluation.grace_lapsed {
            self.spawn_expiry(tenant_id.clone(), now);
        }
        evaluation.decision
    }

    fn spawn_expiry(&self, tenant_id: TenantId, now: Timestamp) {
        let entitlements = self.entitlements.clone();
        tokio::spawn(async move {
            match entitlements.expire_grace_period(&tenant_id, now).await {
                Ok(true) => tracing::info!(tenant_id = %tenant_id, "Grace period expired"),
                Ok(false) => {
                    tracing::debug!(tenant_id = %tenant_id, "Entitlement already moved on")
                }
                Err(e) => {
                    tracing::warn!(tenant_id = %tenant_id, error = %e, "Grace expiry write failed")
                }
            }
        });
    }
}
