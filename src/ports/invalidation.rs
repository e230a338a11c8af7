//! Client-side invalidation ports.
//!
//! `StreamConnector` opens a stream of relay messages; `CacheStore` is the
//! client cache the notices evict from. Both exist so the reconnecting
//! client can be driven by in-process fakes in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::domain::events::RelayMessage;

/// Errors raised by a stream connector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Relay rejected the connection with status {0}")]
    Rejected(u16),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Stream of decoded relay messages; ends when the server closes.
pub type RelayStream = BoxStream<'static, Result<RelayMessage, ClientError>>;

#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Opens a stream, resuming after `last_cursor` when given.
    async fn connect(&self, last_cursor: Option<i64>) -> Result<RelayStream, ClientError>;
}

/// A client-side cache keyed by query key strings.
pub trait CacheStore: Send + Sync {
    /// Evicts every entry whose key starts with `prefix`. Returns the count.
    fn invalidate_prefix(&self, prefix: &str) -> usize;
}
