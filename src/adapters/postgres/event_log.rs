//! PostgreSQL implementation of EventLog.
//!
//! Status transitions are conditional on `status = 'pending'`, so a row can
//! only be moved once even if two writers race on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::domain::events::{EventStatus, LoggedEvent};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{EventId, EventLog};

pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn transition(
        &self,
        id: EventId,
        next: EventStatus,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE domain_events
            SET status = $2, error = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update event status", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find(id).await? {
            None => Err(DomainError::new(
                ErrorCode::EventNotFound,
                format!("Event {} not found", id),
            )),
            Some(row) => row.status.transition_to(next).map(|_| ()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    event_type: String,
    payload: Value,
    status: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for LoggedEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(LoggedEvent {
            id: row.id,
            event_type: row.event_type,
            payload: row.payload,
            status: row.status.parse()?,
            error: row.error,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl EventLog for PostgresEventLog {
    async fn append(&self, event_type: &str, payload: &Value) -> Result<EventId, DomainError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO domain_events (event_type, payload, status)
            VALUES ($1, $2, 'pending')
            RETURNING id
            "#,
        )
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to append event", e))
    }

    async fn mark_processed(&self, id: EventId) -> Result<(), DomainError> {
        self.transition(id, EventStatus::Processed, None).await
    }

    async fn mark_failed(&self, id: EventId, error: &str) -> Result<(), DomainError> {
        self.transition(id, EventStatus::Failed, Some(error)).await
    }

    async fn latest_id(&self) -> Result<EventId, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(id), 0) FROM domain_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to read latest event id", e))
    }

    async fn processed_after(
        &self,
        cursor: EventId,
        limit: u32,
    ) -> Result<Vec<LoggedEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, event_type, payload, status, error, created_at
            FROM domain_events
            WHERE id > $1 AND status = 'processed'
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(cursor)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to read processed events", e))?;

        rows.into_iter().map(LoggedEvent::try_from).collect()
    }

    async fn find(&self, id: EventId) -> Result<Option<LoggedEvent>, DomainError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, event_type, payload, status, error, created_at
            FROM domain_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load event", e))?;

        row.map(LoggedEvent::try_from).transpose()
    }
}
