//! PostgreSQL implementations of the billing store ports.
//!
//! One struct per table. Uniqueness is enforced by the schema: a partial
//! unique index keeps one open subscription per (tenant, provider), and
//! `external_event_id` is unique on the audit table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    PlatformAlert, SubscriptionStatus, TenantBillingEvent, TenantEntitlement, TenantSubscription,
};
use crate::domain::foundation::{
    BillingEventId, DomainError, ErrorCode, SubscriptionId, TenantId, Timestamp,
};
use crate::ports::{
    AlertRepository, BillingEventRepository, EntitlementRepository, SaveResult,
    SubscriptionRepository,
};

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse().map_err(|_| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", s))
    })
}

fn parse_tenant(s: String) -> Result<TenantId, DomainError> {
    TenantId::new(s).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid tenant_id: {}", e))
    })
}

fn ts(dt: Option<DateTime<Utc>>) -> Option<Timestamp> {
    dt.map(Timestamp::from_datetime)
}

// ════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    tenant_id: String,
    provider: String,
    external_subscription_id: Option<String>,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for TenantSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let metadata = match row.metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(TenantSubscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: parse_tenant(row.tenant_id)?,
            provider: row.provider,
            external_subscription_id: row.external_subscription_id,
            status: parse_status(&row.status)?,
            current_period_end: ts(row.current_period_end),
            canceled_at: ts(row.canceled_at),
            metadata,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_open(
        &self,
        tenant_id: &TenantId,
        provider: &str,
    ) -> Result<Option<TenantSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, provider, external_subscription_id, status,
                   current_period_end, canceled_at, metadata, created_at, updated_at
            FROM tenant_subscriptions
            WHERE tenant_id = $1 AND provider = $2
              AND status NOT IN ('canceled', 'expired')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(provider)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find subscription", e))?;

        row.map(TenantSubscription::try_from).transpose()
    }

    async fn insert(&self, subscription: &TenantSubscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_subscriptions (
                id, tenant_id, provider, external_subscription_id, status,
                current_period_end, canceled_at, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.tenant_id.as_str())
        .bind(&subscription.provider)
        .bind(&subscription.external_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(Value::Object(subscription.metadata.clone()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert subscription", e))?;

        Ok(())
    }

    async fn update(&self, subscription: &TenantSubscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_subscriptions SET
                external_subscription_id = $2,
                status = $3,
                current_period_end = $4,
                canceled_at = $5,
                metadata = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.external_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(Value::Object(subscription.metadata.clone()))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.id),
            ));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════
// Entitlements
// ════════════════════════════════════════════════════════════════════

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    tenant_id: String,
    subscription_status: String,
    features_enabled: Vec<String>,
    grace_period_end: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for TenantEntitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(TenantEntitlement {
            tenant_id: parse_tenant(row.tenant_id)?,
            subscription_status: parse_status(&row.subscription_status)?,
            features_enabled: row.features_enabled,
            grace_period_end: ts(row.grace_period_end),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn find(&self, tenant_id: &TenantId) -> Result<Option<TenantEntitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, subscription_status, features_enabled, grace_period_end, updated_at
            FROM tenant_entitlements
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to read entitlement", e))?;

        row.map(TenantEntitlement::try_from).transpose()
    }

    async fn upsert(&self, entitlement: &TenantEntitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_entitlements (
                tenant_id, subscription_status, features_enabled, grace_period_end, updated_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id) DO UPDATE SET
                subscription_status = EXCLUDED.subscription_status,
                features_enabled = EXCLUDED.features_enabled,
                grace_period_end = EXCLUDED.grace_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entitlement.tenant_id.as_str())
        .bind(entitlement.subscription_status.as_str())
        .bind(&entitlement.features_enabled)
        .bind(entitlement.grace_period_end.map(|t| *t.as_datetime()))
        .bind(entitlement.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to upsert entitlement", e))?;

        Ok(())
    }

    async fn expire_grace_period(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenant_entitlements SET
                subscription_status = 'expired',
                features_enabled = '{}',
                updated_at = $2
            WHERE tenant_id = $1 AND subscription_status = 'grace_period'
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to expire entitlement", e))?;

        Ok(result.rows_affected() == 1)
    }
}

// ════════════════════════════════════════════════════════════════════
// Billing event audit
// ════════════════════════════════════════════════════════════════════

pub struct PostgresBillingEventRepository {
    pool: PgPool,
}

impl PostgresBillingEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BillingEventRow {
    id: Uuid,
    tenant_id: String,
    event_type: String,
    external_event_id: Option<String>,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<BillingEventRow> for TenantBillingEvent {
    type Error = DomainError;

    fn try_from(row: BillingEventRow) -> Result<Self, Self::Error> {
        Ok(TenantBillingEvent {
            id: BillingEventId::from_uuid(row.id),
            tenant_id: parse_tenant(row.tenant_id)?,
            event_type: row.event_type,
            external_event_id: row.external_event_id,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl BillingEventRepository for PostgresBillingEventRepository {
    async fn find_by_external_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<TenantBillingEvent>, DomainError> {
        let row: Option<BillingEventRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, event_type, external_event_id, payload, created_at
            FROM tenant_billing_events
            WHERE external_event_id = $1
            "#,
        )
        .bind(external_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to look up billing event", e))?;

        row.map(TenantBillingEvent::try_from).transpose()
    }

    async fn insert(&self, event: &TenantBillingEvent) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_billing_events (
                id, tenant_id, event_type, external_event_id, payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_event_id) DO NOTHING
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.tenant_id.as_str())
        .bind(&event.event_type)
        .bind(&event.external_event_id)
        .bind(&event.payload)
        .bind(event.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record billing event", e))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Alerts
// ════════════════════════════════════════════════════════════════════

pub struct PostgresAlertRepository {
    pool: PgPool,
}

impl PostgresAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn insert(&self, alert: &PlatformAlert) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO platform_alerts (
                id, tenant_id, scope, alert_type, severity, title, body,
                source_type, source_id, metadata, created_at, read_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(alert.id.as_uuid())
        .bind(alert.tenant_id.as_ref().map(|t| t.as_str().to_string()))
        .bind(alert.scope.as_str())
        .bind(&alert.alert_type)
        .bind(alert.severity.as_str())
        .bind(&alert.title)
        .bind(&alert.body)
        .bind(&alert.source_type)
        .bind(&alert.source_id)
        .bind(&alert.metadata)
        .bind(alert.created_at.as_datetime())
        .bind(alert.read_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert alert", e))?;

        Ok(())
    }
}
