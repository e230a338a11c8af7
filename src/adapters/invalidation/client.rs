//! InvalidationClient - keeps a relay stream open and evicts cache entries.
//!
//! ## Reconnects
//!
//! Any transport error or server-side close schedules a reconnect after an
//! exponential backoff (1s doubling to 16s). A `connected` message resets the
//! backoff to its floor. Each reconnect resumes from the last row known to
//! be complete: a row's notices share one cursor, so a row counts as done
//! once a later cursor, a heartbeat, or a `connected` message follows it.
//!
//! ## Shutdown
//!
//! `InvalidationClientHandle::shutdown` stops the loop, cancelling a pending
//! reconnect timer and dropping the open stream. Dropping the handle has the
//! same effect.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::events::{tables, RelayMessage};
use crate::ports::{CacheStore, StreamConnector};

/// Cache key prefixes evicted when a table changes.
pub fn cache_keys_for(table: &str) -> &'static [&'static str] {
    match table {
        tables::ORDERS => &["orders", "dashboard"],
        tables::ORDER_ITEMS => &["orders"],
        tables::PRODUCTS => &["products", "catalog"],
        tables::CATEGORIES => &["categories", "catalog"],
        tables::INVENTORY => &["inventory"],
        tables::PAYMENTS => &["payments", "dashboard"],
        _ => &[],
    }
}

#[derive(Debug, Clone)]
pub struct InvalidationClientConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for InvalidationClientConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
        }
    }
}

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Returns the delay to wait now and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Client lifecycle, observable through the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Live,
    /// Waiting out a reconnect delay.
    Waiting(Duration),
    Stopped,
}

pub struct InvalidationClient {
    connector: Arc<dyn StreamConnector>,
    cache: Arc<dyn CacheStore>,
    config: InvalidationClientConfig,
}

impl InvalidationClient {
    pub fn new(connector: Arc<dyn StreamConnector>, cache: Arc<dyn CacheStore>) -> Self {
        Self::with_config(connector, cache, InvalidationClientConfig::default())
    }

    pub fn with_config(
        connector: Arc<dyn StreamConnector>,
        cache: Arc<dyn CacheStore>,
        config: InvalidationClientConfig,
    ) -> Self {
        Self {
            connector,
            cache,
            config,
        }
    }

    /// Starts the reconnect loop on the current runtime.
    pub fn spawn(self) -> InvalidationClientHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ClientState::Connecting);
        let task = tokio::spawn(self.run(shutdown_rx, state_tx));

        InvalidationClientHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, state: watch::Sender<ClientState>) {
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        let mut cursor = ResumeCursor::default();

        loop {
            state.send_replace(ClientState::Connecting);
            let connected = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.connector.connect(cursor.completed) => result,
            };

            match connected {
                Ok(mut stream) => loop {
                    let item = tokio::select! {
                        biased;
                        _ = shutdown.changed() => {
                            state.send_replace(ClientState::Stopped);
                            return;
                        }
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(message)) => {
                            if let RelayMessage::Connected(_) = message {
                                backoff.reset();
                                state.send_replace(ClientState::Live);
                            }
                            self.apply(message, &mut cursor);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Relay stream failed");
                            break;
                        }
                        None => {
                            tracing::info!(cursor = ?cursor.completed, "Relay closed the stream");
                            break;
                        }
                    }
                },
                Err(e) => tracing::warn!(error = %e, "Relay connect failed"),
            }

            let delay = backoff.next_delay();
            tracing::info!(delay_ms = delay.as_millis() as u64, "Scheduling relay reconnect");
            state.send_replace(ClientState::Waiting(delay));
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = time::sleep(delay) => {}
            }
        }

        state.send_replace(ClientState::Stopped);
    }

    fn apply(&self, message: RelayMessage, cursor: &mut ResumeCursor) {
        match message {
            RelayMessage::Connected(connected) => cursor.reset(connected.cursor),
            RelayMessage::Heartbeat(_) => cursor.settle(),
            RelayMessage::Invalidate(notice) => {
                let mut evicted = 0;
                for prefix in cache_keys_for(&notice.table) {
                    evicted += self.cache.invalidate_prefix(prefix);
                }
                tracing::debug!(
                    table = %notice.table,
                    cursor = notice.cursor,
                    evicted,
                    "Applied invalidation"
                );
                cursor.observe(notice.cursor);
            }
        }
    }
}

/// Resume position for the next connect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ResumeCursor {
    completed: Option<i64>,
    /// Row whose notices may still be arriving.
    pending: Option<i64>,
}

impl ResumeCursor {
    fn reset(&mut self, cursor: i64) {
        self.completed = Some(cursor);
        self.pending = None;
    }

    fn observe(&mut self, cursor: i64) {
        match self.pending {
            Some(pending) if cursor > pending => {
                self.completed = Some(pending);
                self.pending = Some(cursor);
            }
            Some(_) => {}
            None if self.completed.map_or(true, |c| cursor > c) => self.pending = Some(cursor),
            None => {}
        }
    }

    fn settle(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.completed = Some(pending);
        }
    }
}

/// Owner handle for a running client.
pub struct InvalidationClientHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ClientState>,
    task: JoinHandle<()>,
}

impl InvalidationClientHandle {
    pub fn state(&self) -> watch::Receiver<ClientState> {
        self.state.clone()
    }

    /// Stops the client and waits for its task to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Invalidation client task ended abnormally");
        }
    }
}
