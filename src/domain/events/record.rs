//! Event log records and their lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

/// Lifecycle status of a logged domain event.
///
/// A row starts `Pending` and moves exactly once to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processed => "processed",
            EventStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventStatus::Pending)
    }

    /// Validates a transition; only `Pending` may move, and only to a terminal status.
    pub fn transition_to(&self, next: EventStatus) -> Result<EventStatus, DomainError> {
        if *self == EventStatus::Pending && next.is_terminal() {
            Ok(next)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot move event from {} to {}", self, next),
            ))
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "processed" => Ok(EventStatus::Processed),
            "failed" => Ok(EventStatus::Failed),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown event status: {}", other),
            )),
        }
    }
}

/// A row of the append-only event log.
///
/// `event_type` is kept as the stored string so rows written by older
/// deployments still load; readers parse it when they need the closed type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub id: i64,
    pub event_type: String,
    pub payload: Value,
    pub status: EventStatus,
    pub error: Option<String>,
    pub created_at: Timestamp,
}
