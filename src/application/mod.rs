//! Application layer - Use case handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    BillingOutcome, BillingWebhookProcessor, ConnectionState, EntitlementGate, EventDispatcher,
    HandlerRegistry, InvalidationRelay, RelayConfig, RelayConnection, RelayFrame,
};
