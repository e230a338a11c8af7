//! Invalidation notice protocol shared by the relay and its clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Row operation carried by an invalidation notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Derives the operation from an event type name.
    ///
    /// Names containing `created` or `added` are inserts, names containing
    /// `deleted` or `removed` are deletes, anything else is an update.
    pub fn from_event_name(name: &str) -> Self {
        if name.contains("created") || name.contains("added") {
            Operation::Insert
        } else if name.contains("deleted") || name.contains("removed") {
            Operation::Delete
        } else {
            Operation::Update
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invalidation notice, emitted per (event row, affected table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationNotice {
    pub table: String,
    pub operation: Operation,
    #[serde(default)]
    pub id: Option<String>,
    pub cursor: i64,
}

/// Payload of the initial `connected` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub cursor: i64,
}

/// Payload of a `heartbeat` message. Timestamp is Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub timestamp: i64,
}

/// Messages pushed from the relay to a connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Connected(ConnectedPayload),
    Heartbeat(HeartbeatPayload),
    Invalidate(InvalidationNotice),
}

impl RelayMessage {
    pub const CONNECTED: &'static str = "connected";
    pub const HEARTBEAT: &'static str = "heartbeat";
    pub const INVALIDATE: &'static str = "invalidate";

    /// Stream event name for this message.
    pub fn event_name(&self) -> &'static str {
        match self {
            RelayMessage::Connected(_) => Self::CONNECTED,
            RelayMessage::Heartbeat(_) => Self::HEARTBEAT,
            RelayMessage::Invalidate(_) => Self::INVALIDATE,
        }
    }

    /// Cursor position the message refers to, if any.
    pub fn cursor(&self) -> Option<i64> {
        match self {
            RelayMessage::Connected(c) => Some(c.cursor),
            RelayMessage::Heartbeat(_) => None,
            RelayMessage::Invalidate(n) => Some(n.cursor),
        }
    }

    /// JSON body of the message.
    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            RelayMessage::Connected(c) => serde_json::to_string(c),
            RelayMessage::Heartbeat(h) => serde_json::to_string(h),
            RelayMessage::Invalidate(n) => serde_json::to_string(n),
        }
    }

    /// Rebuilds a message from its stream event name and JSON body.
    ///
    /// Returns `None` for unknown names or bodies that do not match the
    /// expected shape.
    pub fn decode(event: &str, data: &str) -> Option<Self> {
        match event {
            Self::CONNECTED => serde_json::from_str(data).ok().map(RelayMessage::Connected),
            Self::HEARTBEAT => serde_json::from_str(data).ok().map(RelayMessage::Heartbeat),
            Self::INVALIDATE => serde_json::from_str(data).ok().map(RelayMessage::Invalidate),
            _ => None,
        }
    }
}

const ENTITY_ID_KEYS: [&str; 3] = ["id", "entityId", "entity_id"];

/// Best-effort extraction of the affected entity id from an event payload.
///
/// Accepts either a JSON object or a string containing serialized JSON.
/// Anything unparseable yields `None`.
pub fn extract_entity_id(payload: &Value) -> Option<String> {
    let parsed;
    let object = match payload {
        Value::Object(map) => map,
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).ok()?;
            parsed.as_object()?
        }
        _ => return None,
    };

    ENTITY_ID_KEYS.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
