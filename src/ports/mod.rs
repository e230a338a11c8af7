//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `EventLog` - Append-only domain event log
//! - `SubscriptionRepository`, `EntitlementRepository`,
//!   `BillingEventRepository`, `AlertRepository` - Billing tables
//!
//! ## Host Ports
//!
//! - `OrderActions`, `CatalogActions`, `InventoryActions`, `PaymentActions` -
//!   Domain action handlers owned by the host application
//! - `SessionValidator` - Session token validation
//!
//! ## Client Ports
//!
//! - `StreamConnector` - Opens a relay stream
//! - `CacheStore` - Cache evicted by invalidation notices

mod billing_store;
mod domain_actions;
mod event_log;
mod invalidation;
mod session_validator;

pub use billing_store::{
    AlertRepository, BillingEventRepository, EntitlementRepository, SaveResult,
    SubscriptionRepository,
};
pub use domain_actions::{CatalogActions, InventoryActions, OrderActions, PaymentActions};
pub use event_log::{EventId, EventLog};
pub use invalidation::{CacheStore, ClientError, RelayStream, StreamConnector};
pub use session_validator::SessionValidator;
