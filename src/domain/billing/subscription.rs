//! Tenant subscription record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BillingEnvelope, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, TenantId, Timestamp};

/// One subscription lifecycle for a tenant with a provider.
///
/// At most one non-terminal row exists per (tenant, provider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSubscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub provider: String,
    pub external_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub metadata: Map<String, Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TenantSubscription {
    /// Opens a new subscription row from an envelope.
    pub fn open(envelope: &BillingEnvelope, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            tenant_id: envelope.tenant_id.clone(),
            provider: envelope.provider.clone(),
            external_subscription_id: envelope.external_subscription_id.clone(),
            status: envelope.status,
            current_period_end: envelope.current_period_end,
            canceled_at: envelope.canceled_at,
            metadata: envelope.metadata.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a newer envelope to this row.
    ///
    /// Status always moves. Optional fields only overwrite when the envelope
    /// carries them, and metadata keys are merged.
    pub fn apply(&mut self, envelope: &BillingEnvelope, now: Timestamp) {
        self.status = envelope.status;
        if envelope.external_subscription_id.is_some() {
            self.external_subscription_id = envelope.external_subscription_id.clone();
        }
        if envelope.current_period_end.is_some() {
            self.current_period_end = envelope.current_period_end;
        }
        if envelope.canceled_at.is_some() {
            self.canceled_at = envelope.canceled_at;
        }
        for (key, value) in &envelope.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
        self.updated_at = now;
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}
