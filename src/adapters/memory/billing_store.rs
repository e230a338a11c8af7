//! In-memory billing store.
//!
//! One struct backs all four billing ports so tests can assert on every
//! write a processor call made. Uniqueness rules mirror the Postgres schema:
//! one open subscription per (tenant, provider) and unique external event ids.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::domain::billing::{
    PlatformAlert, SubscriptionStatus, TenantBillingEvent, TenantEntitlement, TenantSubscription,
};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::ports::{
    AlertRepository, BillingEventRepository, EntitlementRepository, SaveResult,
    SubscriptionRepository,
};

/// Count of writes per table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteCounts {
    pub subscription_inserts: usize,
    pub subscription_updates: usize,
    pub entitlement_upserts: usize,
    pub entitlement_expiries: usize,
    pub billing_events: usize,
    pub alerts: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.subscription_inserts
            + self.subscription_updates
            + self.entitlement_upserts
            + self.entitlement_expiries
            + self.billing_events
            + self.alerts
    }
}

#[derive(Default)]
struct Tables {
    subscriptions: Vec<TenantSubscription>,
    entitlements: HashMap<TenantId, TenantEntitlement>,
    billing_events: Vec<TenantBillingEvent>,
    alerts: Vec<PlatformAlert>,
    writes: WriteCounts,
}

#[derive(Default)]
pub struct InMemoryBillingStore {
    tables: Mutex<Tables>,
    fail_entitlement_reads: AtomicBool,
    fail_entitlement_writes: AtomicBool,
    expire_calls: AtomicUsize,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub async fn writes(&self) -> WriteCounts {
        self.tables.lock().await.writes
    }

    pub async fn subscriptions(&self) -> Vec<TenantSubscription> {
        self.tables.lock().await.subscriptions.clone()
    }

    pub async fn entitlement(&self, tenant_id: &TenantId) -> Option<TenantEntitlement> {
        self.tables.lock().await.entitlements.get(tenant_id).cloned()
    }

    pub async fn billing_events(&self) -> Vec<TenantBillingEvent> {
        self.tables.lock().await.billing_events.clone()
    }

    pub async fn alerts(&self) -> Vec<PlatformAlert> {
        self.tables.lock().await.alerts.clone()
    }

    /// Number of `expire_grace_period` calls, successful or not.
    pub fn expire_calls(&self) -> usize {
        self.expire_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_entitlement_reads(&self, fail: bool) {
        self.fail_entitlement_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_entitlement_writes(&self, fail: bool) {
        self.fail_entitlement_writes.store(fail, Ordering::SeqCst);
    }

    fn offline(operation: &str) -> DomainError {
        DomainError::database(operation, "store offline")
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        provider: &str,
    ) -> Result<Option<TenantSubscription>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .subscriptions
            .iter()
            .find(|s| &s.tenant_id == tenant_id && s.provider == provider && s.is_open())
            .cloned())
    }

    async fn insert(&self, subscription: &TenantSubscription) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        let conflict = subscription.is_open()
            && tables.subscriptions.iter().any(|s| {
                s.tenant_id == subscription.tenant_id
                    && s.provider == subscription.provider
                    && s.is_open()
            });
        if conflict {
            return Err(DomainError::database(
                "Failed to insert subscription",
                "open subscription already exists",
            ));
        }
        tables.subscriptions.push(subscription.clone());
        tables.writes.subscription_inserts += 1;
        Ok(())
    }

    async fn update(&self, subscription: &TenantSubscription) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription {} not found", subscription.id),
                )
            })?;
        *row = subscription.clone();
        tables.writes.subscription_updates += 1;
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryBillingStore {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<TenantEntitlement>, DomainError> {
        if self.fail_entitlement_reads.load(Ordering::SeqCst) {
            return Err(Self::offline("Failed to read entitlement"));
        }
        Ok(self.tables.lock().await.entitlements.get(tenant_id).cloned())
    }

    async fn upsert(&self, entitlement: &TenantEntitlement) -> Result<(), DomainError> {
        if self.fail_entitlement_writes.load(Ordering::SeqCst) {
            return Err(Self::offline("Failed to upsert entitlement"));
        }
        let mut tables = self.tables.lock().await;
        tables
            .entitlements
            .insert(entitlement.tenant_id.clone(), entitlement.clone());
        tables.writes.entitlement_upserts += 1;
        Ok(())
    }

    async fn expire_grace_period(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        self.expire_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_entitlement_writes.load(Ordering::SeqCst) {
            return Err(Self::offline("Failed to expire entitlement"));
        }
        let mut tables = self.tables.lock().await;
        let expired = match tables.entitlements.get(tenant_id) {
            Some(row) if row.subscription_status == SubscriptionStatus::GracePeriod => {
                row.expired(now)
            }
            _ => return Ok(false),
        };
        tables.entitlements.insert(tenant_id.clone(), expired);
        tables.writes.entitlement_expiries += 1;
        Ok(true)
    }
}

#[async_trait]
impl BillingEventRepository for InMemoryBillingStore {
    async fn find_by_external_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<TenantBillingEvent>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .billing_events
            .iter()
            .find(|e| e.external_event_id.as_deref() == Some(external_event_id))
            .cloned())
    }

    async fn insert(&self, event: &TenantBillingEvent) -> Result<SaveResult, DomainError> {
        let mut tables = self.tables.lock().await;
        if let Some(key) = &event.external_event_id {
            if tables
                .billing_events
                .iter()
                .any(|e| e.external_event_id.as_ref() == Some(key))
            {
                return Ok(SaveResult::AlreadyExists);
            }
        }
        tables.billing_events.push(event.clone());
        tables.writes.billing_events += 1;
        Ok(SaveResult::Inserted)
    }
}

#[async_trait]
impl AlertRepository for InMemoryBillingStore {
    async fn insert(&self, alert: &PlatformAlert) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        tables.alerts.push(alert.clone());
        tables.writes.alerts += 1;
        Ok(())
    }
}
