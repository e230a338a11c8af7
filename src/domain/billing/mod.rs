//! Billing domain - subscriptions, entitlements and webhook authenticity.
//!
//! Provider notifications arrive as a `BillingEnvelope`, move the tenant's
//! `TenantSubscription`, and are mirrored into a `TenantEntitlement` that
//! feature gates read.

mod alert;
mod billing_event;
mod entitlement;
mod envelope;
mod subscription;
mod subscription_status;
mod webhook_errors;
mod webhook_verifier;

pub use alert::{template_for, AlertScope, AlertSeverity, AlertTemplate, PlatformAlert};
pub use billing_event::TenantBillingEvent;
pub use entitlement::{
    evaluate, features_for, grace_period_end, DecisionReason, EntitlementDecision, Evaluation,
    TenantEntitlement, DEFAULT_GRACE_PERIOD_DAYS,
};
pub use envelope::BillingEnvelope;
pub use subscription::TenantSubscription;
pub use subscription_status::SubscriptionStatus;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    build_manifest, candidate_manifests, sign_manifest, SignatureHeader, SignatureVerifier,
};
