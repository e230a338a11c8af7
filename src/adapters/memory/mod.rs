//! In-memory adapters for tests and local development.

mod billing_store;
mod event_log;

pub use billing_store::{InMemoryBillingStore, WriteCounts};
pub use event_log::InMemoryEventLog;
