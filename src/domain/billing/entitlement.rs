//! Tenant entitlement and the read-time access decision.

use serde::{Deserialize, Serialize};

use super::{BillingEnvelope, SubscriptionStatus};
use crate::domain::foundation::{TenantId, Timestamp};

/// Default grace window in days.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 7;

/// Feature access for a tenant, one row per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntitlement {
    pub tenant_id: TenantId,
    pub subscription_status: SubscriptionStatus,
    pub features_enabled: Vec<String>,
    pub grace_period_end: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TenantEntitlement {
    /// Builds the entitlement implied by a billing envelope.
    pub fn from_envelope(envelope: &BillingEnvelope, grace_days: i64, now: Timestamp) -> Self {
        Self {
            tenant_id: envelope.tenant_id.clone(),
            subscription_status: envelope.status,
            features_enabled: features_for(envelope.status, &envelope.provider),
            grace_period_end: grace_period_end(
                envelope.status,
                envelope.current_period_end,
                grace_days,
                now,
            ),
            updated_at: now,
        }
    }

    /// The same row after the grace window has closed.
    pub fn expired(&self, now: Timestamp) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            subscription_status: SubscriptionStatus::Expired,
            features_enabled: Vec::new(),
            grace_period_end: self.grace_period_end,
            updated_at: now,
        }
    }
}

/// Feature tags enabled for a status. The provider name is the tag.
pub fn features_for(status: SubscriptionStatus, provider: &str) -> Vec<String> {
    if status.grants_features() {
        vec![provider.to_string()]
    } else {
        Vec::new()
    }
}

/// End of the grace window, only set for `grace_period`.
///
/// Measured from the period end when the provider sends one, else from now.
pub fn grace_period_end(
    status: SubscriptionStatus,
    current_period_end: Option<Timestamp>,
    grace_days: i64,
    now: Timestamp,
) -> Option<Timestamp> {
    match status {
        SubscriptionStatus::GracePeriod => {
            Some(current_period_end.unwrap_or(now).add_days(grace_days))
        }
        _ => None,
    }
}

/// Why access was granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The gate is switched off; everyone is allowed.
    EntitlementDisabled,
    /// No entitlement row for the tenant.
    None,
    /// Grace window closed.
    Expired,
    PastDue,
    Canceled,
    /// Entitlement could not be read.
    Unavailable,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::EntitlementDisabled => "entitlement_disabled",
            DecisionReason::None => "none",
            DecisionReason::Expired => "expired",
            DecisionReason::PastDue => "past_due",
            DecisionReason::Canceled => "canceled",
            DecisionReason::Unavailable => "unavailable",
        }
    }
}

/// Structured allow/deny result of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DecisionReason>,
}

impl EntitlementDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn allow_because(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason: Some(reason),
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Outcome of evaluating a stored entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: EntitlementDecision,
    /// The row is in a grace period that has already closed and should be
    /// written back as expired.
    pub grace_lapsed: bool,
}

/// Decides access from the stored row. Pure; the caller owns any write-back.
pub fn evaluate(entitlement: Option<&TenantEntitlement>, now: Timestamp) -> Evaluation {
    let denied = |reason| Evaluation {
        decision: EntitlementDecision::deny(reason),
        grace_lapsed: false,
    };

    let Some(row) = entitlement else {
        return denied(DecisionReason::None);
    };

    match row.subscription_status {
        SubscriptionStatus::Active => Evaluation {
            decision: EntitlementDecision::allow(),
            grace_lapsed: false,
        },
        SubscriptionStatus::GracePeriod => match row.grace_period_end {
            Some(end) if end.is_after(&now) => Evaluation {
                decision: EntitlementDecision::allow(),
                grace_lapsed: false,
            },
            _ => Evaluation {
                decision: EntitlementDecision::deny(DecisionReason::Expired),
                grace_lapsed: true,
            },
        },
        SubscriptionStatus::PastDue => denied(DecisionReason::PastDue),
        SubscriptionStatus::Canceled => denied(DecisionReason::Canceled),
        SubscriptionStatus::Expired => denied(DecisionReason::Expired),
        SubscriptionStatus::None => denied(DecisionReason::None),
    }
}
