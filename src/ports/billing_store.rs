//! Billing store ports - subscriptions, entitlements, audit rows and alerts.
//!
//! Split by table so each adapter method maps to one statement. The
//! processor composes them without a surrounding transaction; partial
//! application is corrected by the next delivery.

use async_trait::async_trait;

use crate::domain::billing::{
    PlatformAlert, TenantBillingEvent, TenantEntitlement, TenantSubscription,
};
use crate::domain::foundation::{DomainError, TenantId, Timestamp};

/// Result of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// The row was written.
    Inserted,
    /// A row with the same key already existed; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The non-terminal subscription for (tenant, provider), if any.
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        provider: &str,
    ) -> Result<Option<TenantSubscription>, DomainError>;

    async fn insert(&self, subscription: &TenantSubscription) -> Result<(), DomainError>;

    async fn update(&self, subscription: &TenantSubscription) -> Result<(), DomainError>;
}

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<TenantEntitlement>, DomainError>;

    /// Atomic insert-or-update keyed by tenant.
    async fn upsert(&self, entitlement: &TenantEntitlement) -> Result<(), DomainError>;

    /// Marks the row expired with no features, only if it is still in
    /// `grace_period`. Returns true when a row was changed.
    async fn expire_grace_period(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError>;
}

#[async_trait]
pub trait BillingEventRepository: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<TenantBillingEvent>, DomainError>;

    /// Appends an audit row. A taken `external_event_id` yields
    /// `SaveResult::AlreadyExists` instead of an error.
    async fn insert(&self, event: &TenantBillingEvent) -> Result<SaveResult, DomainError>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: &PlatformAlert) -> Result<(), DomainError>;
}
