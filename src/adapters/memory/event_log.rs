//! In-memory event log.
//!
//! Same contract as the Postgres log, used by tests and local development.
//! Reads can be switched to fail to exercise error paths.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::events::{EventStatus, LoggedEvent};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{EventId, EventLog};

#[derive(Default)]
pub struct InMemoryEventLog {
    rows: Mutex<Vec<LoggedEvent>>,
    fail_reads: AtomicBool,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Appends a row that is already processed.
    pub async fn push_processed(&self, event_type: &str, payload: Value) -> EventId {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as EventId + 1;
        rows.push(LoggedEvent {
            id,
            event_type: event_type.to_string(),
            payload,
            status: EventStatus::Processed,
            error: None,
            created_at: Timestamp::now(),
        });
        id
    }

    /// Snapshot of every row.
    pub async fn rows(&self) -> Vec<LoggedEvent> {
        self.rows.lock().await.clone()
    }

    /// Makes `latest_id` and `processed_after` fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), DomainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::database("Failed to read event log", "store offline"));
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: EventId,
        next: EventStatus,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::new(ErrorCode::EventNotFound, format!("Event {} not found", id)))?;
        row.status = row.status.transition_to(next)?;
        row.error = error.map(str::to_string);
        Ok(())
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event_type: &str, payload: &Value) -> Result<EventId, DomainError> {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as EventId + 1;
        rows.push(LoggedEvent {
            id,
            event_type: event_type.to_string(),
            payload: payload.clone(),
            status: EventStatus::Pending,
            error: None,
            created_at: Timestamp::now(),
        });
        Ok(id)
    }

    async fn mark_processed(&self, id: EventId) -> Result<(), DomainError> {
        self.transition(id, EventStatus::Processed, None).await
    }

    async fn mark_failed(&self, id: EventId, error: &str) -> Result<(), DomainError> {
        self.transition(id, EventStatus::Failed, Some(error)).await
    }

    async fn latest_id(&self) -> Result<EventId, DomainError> {
        self.check_reads()?;
        Ok(self.rows.lock().await.last().map(|r| r.id).unwrap_or(0))
    }

    async fn processed_after(
        &self,
        cursor: EventId,
        limit: u32,
    ) -> Result<Vec<LoggedEvent>, DomainError> {
        self.check_reads()?;
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.id > cursor && r.status == EventStatus::Processed)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find(&self, id: EventId) -> Result<Option<LoggedEvent>, DomainError> {
        Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
    }
}
