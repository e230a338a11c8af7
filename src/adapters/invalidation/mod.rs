//! Invalidation client - consumes the relay stream and evicts cached queries.
//!
//! - `connector` - reqwest-based `StreamConnector`
//! - `sse` - incremental event-stream decoder
//! - `cache` - in-memory `CacheStore`
//! - `client` - reconnecting loop with exponential backoff

mod cache;
mod client;
mod connector;
mod sse;

pub use cache::QueryCache;
pub use client::{
    cache_keys_for, Backoff, ClientState, InvalidationClient, InvalidationClientConfig,
    InvalidationClientHandle,
};
pub use connector::HttpStreamConnector;
pub use sse::{SseDecoder, SseFrame};
