//! EventLog port - the append-only log of domain events.
//!
//! The log is the system of record for domain actions and the source tailed
//! by the invalidation relay. Writers only insert a row or move a row they
//! created; readers only see rows that already reached `processed`.
//!
//! ## Lifecycle
//!
//! ```text
//! append ──► pending ──┬──► processed
//!                      └──► failed
//! ```
//!
//! A row is moved at most once. Implementations must reject a second
//! transition with `ErrorCode::InvalidStateTransition` rather than overwrite
//! the terminal status.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::events::LoggedEvent;
use crate::domain::foundation::DomainError;

/// Store-assigned, monotonically increasing event id.
pub type EventId = i64;

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Inserts a `pending` row and returns its assigned id.
    async fn append(&self, event_type: &str, payload: &Value) -> Result<EventId, DomainError>;

    /// Moves a pending row to `processed`.
    async fn mark_processed(&self, id: EventId) -> Result<(), DomainError>;

    /// Moves a pending row to `failed`, recording the error message.
    async fn mark_failed(&self, id: EventId, error: &str) -> Result<(), DomainError>;

    /// Highest id in the log, or 0 when empty.
    async fn latest_id(&self) -> Result<EventId, DomainError>;

    /// Processed rows with `id > cursor`, ascending by id, at most `limit`.
    async fn processed_after(
        &self,
        cursor: EventId,
        limit: u32,
    ) -> Result<Vec<LoggedEvent>, DomainError>;

    /// Loads one row by id.
    async fn find(&self, id: EventId) -> Result<Option<LoggedEvent>, DomainError>;
}
