//! Application handlers.
//!
//! Orchestrate domain types and ports for each use case.
//!
//! - `dispatch` - Logs and routes domain actions to the host's handlers
//! - `billing_webhook` - Applies billing envelopes to tenant state
//! - `entitlement_gate` - Read-time feature access decisions
//! - `invalidation_relay` - Per-connection event log tailing

mod billing_webhook;
mod dispatch;
mod entitlement_gate;
mod invalidation_relay;

pub use billing_webhook::{BillingOutcome, BillingWebhookProcessor};
pub use dispatch::{EventDispatcher, HandlerRegistry};
pub use entitlement_gate::EntitlementGate;
pub use invalidation_relay::{
    notices_for, parse_cursor, ConnectionState, InvalidationRelay, RelayConfig, RelayConnection,
    RelayFrame,
};
