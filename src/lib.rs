//! Tenant Relay - event-sourced consistency relay for multi-tenant stores.
//!
//! Billing webhooks and host domain actions are recorded in an append-only
//! event log. Processed rows are streamed to clients as cache invalidation
//! notices, and feature access is gated on each tenant's entitlement.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
