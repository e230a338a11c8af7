//! Domain events - the event log vocabulary and invalidation protocol.
//!
//! - `event_type` - closed set of dot-namespaced event types
//! - `record` - event log rows and their pending/terminal lifecycle
//! - `invalidation` - notices streamed to clients when processed rows appear

mod event_type;
mod invalidation;
mod record;

pub use event_type::{tables, DomainEventType};
pub use invalidation::{
    extract_entity_id, ConnectedPayload, HeartbeatPayload, InvalidationNotice, Operation,
    RelayMessage,
};
pub use record::{EventStatus, LoggedEvent};
