//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - sqlx-backed event log and billing tables
//! - `memory` - in-process stores for tests and local development
//! - `auth` - HS256 session tokens and a mock validator
//! - `http` - axum routers (webhooks, relay stream, entitlement)
//! - `invalidation` - client that consumes the relay stream
//! - `provider` - billing provider OAuth client

pub mod auth;
pub mod http;
pub mod invalidation;
pub mod memory;
pub mod postgres;
pub mod provider;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use invalidation::{HttpStreamConnector, InvalidationClient, QueryCache};
pub use memory::{InMemoryBillingStore, InMemoryEventLog};
pub use postgres::{PostgresEventLog, PostgresSubscriptionRepository};
pub use provider::ProviderOAuthClient;
