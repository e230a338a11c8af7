//! Provider-agnostic billing envelope.
//!
//! Billing providers are normalised upstream into this shape before they
//! reach the processor. Parsing is two-step: serde reads a loose raw form,
//! then `validate` enforces required fields and typed values.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::SubscriptionStatus;
use crate::domain::foundation::{TenantId, Timestamp, ValidationError};

/// A validated billing notification.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingEnvelope {
    pub tenant_id: TenantId,
    pub provider: String,
    pub event_type: String,
    pub status: SubscriptionStatus,
    pub external_subscription_id: Option<String>,
    pub external_event_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub canceled_at: Option<Timestamp>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    tenant_id: Option<String>,
    provider: Option<String>,
    event_type: Option<String>,
    status: Option<String>,
    external_subscription_id: Option<String>,
    external_event_id: Option<String>,
    current_period_end: Option<String>,
    canceled_at: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl BillingEnvelope {
    /// Validates a raw JSON payload into an envelope.
    pub fn validate(raw: &Value) -> Result<Self, ValidationError> {
        let raw: RawEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| ValidationError::invalid_format("envelope", e.to_string()))?;

        let tenant_id = TenantId::new(required(raw.tenant_id, "tenantId")?)?;
        let provider = required(raw.provider, "provider")?;
        let event_type = required(raw.event_type, "eventType")?;
        let status = required(raw.status, "status")?.parse::<SubscriptionStatus>()?;

        Ok(Self {
            tenant_id,
            provider,
            event_type,
            status,
            external_subscription_id: non_blank(raw.external_subscription_id),
            external_event_id: non_blank(raw.external_event_id),
            current_period_end: timestamp(raw.current_period_end, "currentPeriodEnd")?,
            canceled_at: timestamp(raw.canceled_at, "canceledAt")?,
            metadata: raw.metadata.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    non_blank(value).ok_or_else(|| ValidationError::empty_field(field))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn timestamp(value: Option<String>, field: &str) -> Result<Option<Timestamp>, ValidationError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => Timestamp::parse_rfc3339(&raw)
            .map(Some)
            .map_err(|e| ValidationError::invalid_format(field, e.to_string())),
    }
}
