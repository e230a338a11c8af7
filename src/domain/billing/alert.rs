//! Platform alerts raised for actionable subscription states.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{BillingEnvelope, SubscriptionStatus, TenantSubscription};
use crate::domain::foundation::{AlertId, TenantId, Timestamp};

/// Audience of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    Tenant,
    Admin,
}

impl AlertScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertScope::Tenant => "tenant",
            AlertScope::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Static text and severity for one alertable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTemplate {
    pub alert_type: &'static str,
    pub severity: AlertSeverity,
    pub title: &'static str,
    pub body: &'static str,
}

const PAST_DUE: AlertTemplate = AlertTemplate {
    alert_type: "billing.past_due",
    severity: AlertSeverity::Warning,
    title: "Payment past due",
    body: "The latest subscription charge failed. Update the payment method to keep premium features.",
};

const GRACE_PERIOD: AlertTemplate = AlertTemplate {
    alert_type: "billing.grace_period",
    severity: AlertSeverity::Warning,
    title: "Subscription in grace period",
    body: "The subscription has lapsed. Premium features stay on until the grace period ends.",
};

const CANCELED: AlertTemplate = AlertTemplate {
    alert_type: "billing.canceled",
    severity: AlertSeverity::Critical,
    title: "Subscription canceled",
    body: "The subscription was canceled and premium features have been turned off.",
};

const EXPIRED: AlertTemplate = AlertTemplate {
    alert_type: "billing.expired",
    severity: AlertSeverity::Critical,
    title: "Subscription expired",
    body: "The subscription has expired and premium features have been turned off.",
};

/// Alert template for a status, `None` when the status needs no alert.
pub fn template_for(status: SubscriptionStatus) -> Option<&'static AlertTemplate> {
    match status {
        SubscriptionStatus::PastDue => Some(&PAST_DUE),
        SubscriptionStatus::GracePeriod => Some(&GRACE_PERIOD),
        SubscriptionStatus::Canceled => Some(&CANCELED),
        SubscriptionStatus::Expired => Some(&EXPIRED),
        SubscriptionStatus::Active | SubscriptionStatus::None => None,
    }
}

/// A notification shown to a tenant or to platform admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAlert {
    pub id: AlertId,
    /// `None` for global broadcasts.
    pub tenant_id: Option<TenantId>,
    pub scope: AlertScope,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub body: String,
    pub source_type: String,
    pub source_id: String,
    pub metadata: Value,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

impl PlatformAlert {
    pub const SOURCE_SUBSCRIPTION: &'static str = "tenant_subscription";

    /// Builds the tenant alert for a subscription transition, if the new
    /// status is alertable.
    pub fn for_subscription(
        envelope: &BillingEnvelope,
        subscription: &TenantSubscription,
        now: Timestamp,
    ) -> Option<Self> {
        let template = template_for(envelope.status)?;
        Some(Self {
            id: AlertId::new(),
            tenant_id: Some(envelope.tenant_id.clone()),
            scope: AlertScope::Tenant,
            alert_type: template.alert_type.to_string(),
            severity: template.severity,
            title: template.title.to_string(),
            body: template.body.to_string(),
            source_type: Self::SOURCE_SUBSCRIPTION.to_string(),
            source_id: subscription.id.to_string(),
            metadata: json!({
                "provider": envelope.provider,
                "eventType": envelope.event_type,
                "status": envelope.status,
                "externalEventId": envelope.external_event_id,
            }),
            created_at: now,
            read_at: None,
        })
    }
}
