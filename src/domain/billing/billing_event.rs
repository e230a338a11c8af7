//! Billing event audit record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BillingEnvelope;
use crate::domain::foundation::{BillingEventId, TenantId, Timestamp};

/// An accepted billing notification, kept for audit and replay.
///
/// `external_event_id` is the dedup key when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantBillingEvent {
    pub id: BillingEventId,
    pub tenant_id: TenantId,
    pub event_type: String,
    pub external_event_id: Option<String>,
    pub payload: Value,
    pub created_at: Timestamp,
}

impl TenantBillingEvent {
    /// Records an envelope alongside the raw payload it was parsed from.
    pub fn record(envelope: &BillingEnvelope, raw: &Value, now: Timestamp) -> Self {
        Self {
            id: BillingEventId::new(),
            tenant_id: envelope.tenant_id.clone(),
            event_type: envelope.event_type.clone(),
            external_event_id: envelope.external_event_id.clone(),
            payload: raw.clone(),
            created_at: now,
        }
    }
}
