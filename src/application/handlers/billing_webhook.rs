//! BillingWebhookProcessor - applies a billing envelope to tenant state.
//!
//! Steps, in order:
//!
//! 1. Validate the envelope (invalid payloads are logged and reported, never raised)
//! 2. Skip deliveries whose `externalEventId` is already recorded
//! 3. Update the tenant's open subscription for the provider, or open one
//! 4. Upsert the entitlement, including the grace window end
//! 5. Append the audit row that future deliveries dedup against
//! 6. Raise a platform alert for actionable statuses
//!
//! Store errors in steps 3-6 propagate; the webhook boundary still
//! acknowledges the provider and the next delivery heals partial writes.

use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

use crate::domain::billing::{
    BillingEnvelope, PlatformAlert, SubscriptionStatus, TenantBillingEvent, TenantEntitlement,
    TenantSubscription, DEFAULT_GRACE_PERIOD_DAYS,
};
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::ports::{
    AlertRepository, BillingEventRepository, EntitlementRepository, SaveResult,
    SubscriptionRepository,
};

/// What a processed delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingOutcome {
    /// The envelope was applied.
    Applied {
        tenant_id: TenantId,
        status: SubscriptionStatus,
        alert_raised: bool,
    },
    /// The external event id was already recorded; nothing was written.
    Duplicate,
    /// The payload was not a valid envelope; nothing was written.
    Invalid(String),
}

pub struct BillingWebhookProcessor {
    subscriptions: Arc<dyn SubscriptionRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    billing_events: Arc<dyn BillingEventRepository>,
    alerts: Arc<dyn AlertRepository>,
    grace_period_days: i64,
}

impl BillingWebhookProcessor {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        billing_events: Arc<dyn BillingEventRepository>,
        alerts: Arc<dyn AlertRepository>,
    ) -> Self {
        Self {
            subscriptions,
            entitlements,
            billing_events,
            alerts,
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
        }
    }

    pub fn with_grace_period_days(mut self, days: i64) -> Self {
        self.grace_period_days = days;
        self
    }

    /// Processes one raw billing payload.
    pub async fn process(&self, raw: &Value) -> Result<BillingOutcome, DomainError> {
        let envelope = match BillingEnvelope::validate(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid billing payload, skipping");
                return Ok(BillingOutcome::Invalid(e.to_string()));
            }
        };

        let span = tracing::info_span!(
            "billing_event",
            tenant_id = %envelope.tenant_id,
            event_type = %envelope.event_type,
            status = %envelope.status,
        );
        self.apply(envelope, raw).instrument(span).await
    }

    async fn apply(
        &self,
        envelope: BillingEnvelope,
        raw: &Value,
    ) -> Result<BillingOutcome, DomainError> {
        if let Some(external_id) = &envelope.external_event_id {
            if self.billing_events.find_by_external_id(external_id).await?.is_some() {
                tracing::info!(external_event_id = %external_id, "Duplicate billing event, skipped");
                return Ok(BillingOutcome::Duplicate);
            }
        }

        let now = Timestamp::now();
        let subscription = self.upsert_subscription(&envelope, now).await?;

        let entitlement = TenantEntitlement::from_envelope(&envelope, self.grace_period_days, now);
        self.entitlements.upsert(&entitlement).await?;

        let audit = TenantBillingEvent::record(&envelope, raw, now);
        if self.billing_events.insert(&audit).await? == SaveResult::AlreadyExists {
            tracing::info!(
                external_event_id = ?envelope.external_event_id,
                "Billing event recorded concurrently, treating as duplicate"
            );
            return Ok(BillingOutcome::Duplicate);
        }

        let alert_raised = match PlatformAlert::for_subscription(&envelope, &subscription, now) {
            Some(alert) => {
                self.alerts.insert(&alert).await?;
                tracing::info!(severity = alert.severity.as_str(), "Platform alert raised");
                true
            }
            None => false,
        };

        tracing::info!("Billing event applied");
        Ok(BillingOutcome::Applied {
            tenant_id: envelope.tenant_id,
            status: envelope.status,
            alert_raised,
        })
    }

    async fn upsert_subscription(
        &self,
        envelope: &BillingEnvelope,
        now: Timestamp,
    ) -> Result<TenantSubscription, DomainError> {
        match self
            .subscriptions
            .find_open(&envelope.tenant_id, &envelope.provider)
            .await?
        {
            Some(mut existing) => {
                existing.apply(envelope, now);
                self.subscriptions.update(&existing).await?;
                Ok(existing)
            }
            None => {
                let opened = TenantSubscription::open(envelope, now);
                self.subscriptions.insert(&opened).await?;
                Ok(opened)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, WriteCounts};
    use crate::domain::billing::{AlertSeverity, SubscriptionStatus};
    use crate::domain::foundation::ErrorCode;
    use serde_json::json;

    fn processor() -> (BillingWebhookProcessor, Arc<InMemoryBillingStore>) {
        let store = Arc::new(InMemoryBillingStore::new());
        let processor =
            BillingWebhookProcessor::new(store.clone(), store.clone(), store.clone(), store.clone());
        (processor, store)
    }

    fn tenant() -> TenantId {
        TenantId::new("t1").unwrap()
    }

    fn activated() -> Value {
        json!({
            "tenantId": "t1",
            "provider": "mercadopago",
            "eventType": "subscription.activated",
            "status": "active"
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Lifecycle scenarios
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn first_activation_opens_subscription_and_enables_provider() {
        let (processor, store) = processor();

        let outcome = processor.process(&activated()).await.unwrap();

        assert_eq!(
            outcome,
            BillingOutcome::Applied {
                tenant_id: tenant(),
                status: SubscriptionStatus::Active,
                alert_raised: false,
            }
        );
        let writes = store.writes().await;
        assert_eq!(writes.subscription_inserts, 1);
        assert_eq!(writes.entitlement_upserts, 1);
        assert_eq!(writes.alerts, 0);

        let subs = store.subscriptions().await;
        assert_eq!(subs[0].status, SubscriptionStatus::Active);
        let ent = store.entitlement(&tenant()).await.unwrap();
        assert_eq!(ent.features_enabled, vec!["mercadopago".to_string()]);
    }

    #[tokio::test]
    async fn grace_period_updates_row_and_raises_warning() {
        let (processor, store) = processor();
        processor.process(&activated()).await.unwrap();

        processor
            .process(&json!({
                "tenantId": "t1",
                "provider": "mercadopago",
                "eventType": "subscription.payment_failed",
                "status": "grace_period",
                "currentPeriodEnd": "2026-01-01T00:00:00Z"
            }))
            .await
            .unwrap();

        let subs = store.subscriptions().await;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, SubscriptionStatus::GracePeriod);

        let ent = store.entitlement(&tenant()).await.unwrap();
        assert_eq!(
            ent.grace_period_end.unwrap().to_rfc3339(),
            "2026-01-08T00:00:00Z"
        );
        assert_eq!(ent.features_enabled, vec!["mercadopago".to_string()]);

        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[tokio::test]
    async fn configured_grace_window_is_used() {
        let (processor, store) = processor();
        let processor = processor.with_grace_period_days(3);

        processor
            .process(&json!({
                "tenantId": "t1", "provider": "mercadopago",
                "eventType": "subscription.lapsed", "status": "grace_period",
                "currentPeriodEnd": "2026-01-01T00:00:00Z"
            }))
            .await
            .unwrap();

        let ent = store.entitlement(&tenant()).await.unwrap();
        assert_eq!(
            ent.grace_period_end.unwrap().to_rfc3339(),
            "2026-01-04T00:00:00Z"
        );
    }

    #[tokio::test]
    async fn cancellation_closes_row_and_next_activation_opens_new_one() {
        let (processor, store) = processor();
        processor.process(&activated()).await.unwrap();

        let outcome = processor
            .process(&json!({
                "tenantId": "t1", "provider": "mercadopago",
                "eventType": "subscription.canceled", "status": "canceled"
            }))
            .await
            .unwrap();
        assert!(matches!(outcome, BillingOutcome::Applied { alert_raised: true, .. }));
        assert_eq!(store.subscriptions().await.len(), 1);
        assert_eq!(store.alerts().await[0].severity, AlertSeverity::Critical);

        processor.process(&activated()).await.unwrap();
        let subs = store.subscriptions().await;
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].status, SubscriptionStatus::Canceled);
        assert_eq!(subs[1].status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn providers_keep_separate_subscriptions() {
        let (processor, store) = processor();
        processor.process(&activated()).await.unwrap();

        let mut other = activated();
        other["provider"] = json!("stripe");
        processor.process(&other).await.unwrap();

        assert_eq!(store.subscriptions().await.len(), 2);
        let ent = store.entitlement(&tenant()).await.unwrap();
        assert_eq!(ent.features_enabled, vec!["stripe".to_string()]);
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotence
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_external_event_id_writes_nothing() {
        let (processor, store) = processor();
        let mut payload = activated();
        payload["externalEventId"] = json!("evt_1");

        processor.process(&payload).await.unwrap();
        let after_first = store.writes().await;

        let outcome = processor.process(&payload).await.unwrap();

        assert_eq!(outcome, BillingOutcome::Duplicate);
        assert_eq!(store.writes().await, after_first);
        assert_eq!(store.billing_events().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_external_event_id_is_not_deduplicated() {
        let (processor, store) = processor();

        processor.process(&activated()).await.unwrap();
        processor.process(&activated()).await.unwrap();

        assert_eq!(store.billing_events().await.len(), 2);
        assert_eq!(store.writes().await.subscription_updates, 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Invalid payloads and failures
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_payload_is_reported_without_side_effects() {
        let (processor, store) = processor();

        let outcome = processor
            .process(&json!({"tenantId": "t1", "status": "active"}))
            .await
            .unwrap();

        assert!(matches!(outcome, BillingOutcome::Invalid(_)));
        assert_eq!(store.writes().await, WriteCounts::default());
    }

    #[tokio::test]
    async fn store_failure_propagates_after_partial_application() {
        let (processor, store) = processor();
        store.set_fail_entitlement_writes(true);

        let err = processor.process(&activated()).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        let writes = store.writes().await;
        assert_eq!(writes.subscription_inserts, 1);
        assert_eq!(writes.billing_events, 0);

        store.set_fail_entitlement_writes(false);
        processor.process(&activated()).await.unwrap();
        assert!(store.entitlement(&tenant()).await.is_some());
    }
}
