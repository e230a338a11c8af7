//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, auth)
//! - `events` - Event log vocabulary and the invalidation notice protocol
//! - `billing` - Subscription lifecycle, entitlements and webhook verification

pub mod billing;
pub mod events;
pub mod foundation;
