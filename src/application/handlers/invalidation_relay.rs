//! InvalidationRelay - tails the event log for one client connection.
//!
//! Each connection gets its own task and cursor. The task runs three timers
//! in one `select!` loop, so they stop together:
//!
//! - poll: read processed rows past the cursor and emit one notice per
//!   (row, affected table)
//! - heartbeat: emit a timestamp so half-open connections surface
//! - lifetime: close the connection after a fixed cap
//!
//! Dropping the message receiver is the disconnect signal. Every send and
//! every log read is bounded by the lifetime deadline, so a client that
//! stops reading is still cut off at the cap.
//!
//! Each frame carries a resume id. Only the last notice of a row sets it,
//! so a client that resumes from it never skips a table of a half-sent row.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 2s | How often to read new rows |
//! | `heartbeat_interval` | 25s | How often to send a heartbeat |
//! | `max_lifetime` | 5m | Connection cap before the client must reconnect |
//! | `batch_size` | 100 | Max rows read per poll |

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::domain::events::{
    extract_entity_id, ConnectedPayload, DomainEventType, HeartbeatPayload, InvalidationNotice,
    LoggedEvent, Operation, RelayMessage,
};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{EventId, EventLog};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub max_lifetime: Duration,
    pub batch_size: u32,
    /// Messages buffered per connection before the poll waits on the client.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            heartbeat_interval: Duration::from_millis(25_000),
            max_lifetime: Duration::from_secs(300),
            batch_size: 100,
            channel_capacity: 256,
        }
    }
}

/// Lifecycle of one relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Streaming,
    Closed,
}

/// Notices for one event log row, one per affected table.
///
/// Unknown event types affect no tables.
pub fn notices_for(event: &LoggedEvent) -> Vec<InvalidationNotice> {
    let tables = match event.event_type.parse::<DomainEventType>() {
        Ok(event_type) => event_type.affected_tables(),
        Err(_) => {
            tracing::debug!(event_id = event.id, event_type = %event.event_type, "No tables mapped for event type");
            return Vec::new();
        }
    };
    let operation = Operation::from_event_name(&event.event_type);
    let id = extract_entity_id(&event.payload);

    tables
        .iter()
        .map(|table| InvalidationNotice {
            table: (*table).to_string(),
            operation,
            id: id.clone(),
            cursor: event.id,
        })
        .collect()
}

/// Parses a resumption token; only non-negative integers are accepted.
pub fn parse_cursor(last_event_id: Option<&str>) -> Option<EventId> {
    last_event_id
        .and_then(|raw| raw.trim().parse::<EventId>().ok())
        .filter(|cursor| *cursor >= 0)
}

pub struct InvalidationRelay {
    log: Arc<dyn EventLog>,
    config: RelayConfig,
}

impl InvalidationRelay {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self::with_config(log, RelayConfig::default())
    }

    pub fn with_config(log: Arc<dyn EventLog>, config: RelayConfig) -> Self {
        Self { log, config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Starting cursor: the client's token if numeric, else the newest id so
    /// fresh connections do not replay history.
    pub async fn resolve_cursor(&self, last_event_id: Option<&str>) -> Result<EventId, DomainError> {
        match parse_cursor(last_event_id) {
            Some(cursor) => Ok(cursor),
            None => self.log.latest_id().await,
        }
    }

    /// Opens a connection and starts its task.
    pub async fn open(&self, last_event_id: Option<&str>) -> Result<RelayConnection, DomainError> {
        let connection_id = Uuid::new_v4();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let cursor = self.resolve_cursor(last_event_id).await?;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        tracing::debug!(%connection_id, cursor, "Relay connection opened");
        let task = ConnectionTask {
            log: self.log.clone(),
            config: self.config.clone(),
            connection_id,
            cursor,
            tx,
            state: state_tx,
        };
        tokio::spawn(task.run());

        Ok(RelayConnection {
            id: connection_id,
            cursor,
            messages: rx,
            state: state_rx,
        })
    }
}

/// One message as sent to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    pub message: RelayMessage,
    /// Cursor a client may resume from once this frame is handled.
    pub resume_id: Option<EventId>,
}

impl RelayFrame {
    fn new(message: RelayMessage, resume_id: Option<EventId>) -> Self {
        Self { message, resume_id }
    }
}

/// Client side of an open relay connection.
pub struct RelayConnection {
    pub id: Uuid,
    /// Cursor the connection started from.
    pub cursor: EventId,
    messages: mpsc::Receiver<RelayFrame>,
    state: watch::Receiver<ConnectionState>,
}

impl RelayConnection {
    /// Next message, or `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.messages.recv().await.map(|frame| frame.message)
    }

    /// Next frame with its resume id.
    pub async fn recv_frame(&mut self) -> Option<RelayFrame> {
        self.messages.recv().await
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Turns the connection into a message stream. Dropping the stream
    /// disconnects.
    pub fn into_stream(self) -> impl Stream<Item = RelayMessage> + Send + 'static {
        self.into_frames().map(|frame| frame.message)
    }

    /// Like `into_stream`, keeping each frame's resume id.
    pub fn into_frames(self) -> impl Stream<Item = RelayFrame> + Send + 'static {
        stream::unfold(self.messages, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        })
    }
}

struct ConnectionTask {
    log: Arc<dyn EventLog>,
    config: RelayConfig,
    connection_id: Uuid,
    cursor: EventId,
    tx: mpsc::Sender<RelayFrame>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionTask {
    async fn run(mut self) {
        self.state.send_replace(ConnectionState::Streaming);

        let deadline = Instant::now() + self.config.max_lifetime;
        let connected = RelayMessage::Connected(ConnectedPayload {
            cursor: self.cursor,
        });
        if self.send(connected, Some(self.cursor), deadline).await {
            self.stream(deadline).await;
        }

        self.state.send_replace(ConnectionState::Closed);
        tracing::debug!(connection_id = %self.connection_id, cursor = self.cursor, "Relay connection closed");
    }

    async fn stream(&mut self, deadline: Instant) {
        let start = Instant::now();
        let mut poll = time::interval_at(start + self.config.poll_interval, self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = time::interval_at(
            start + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let lifetime = time::sleep_until(deadline);
        tokio::pin!(lifetime);

        loop {
            let tx = self.tx.clone();
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!(connection_id = %self.connection_id, "Relay client disconnected");
                    return;
                }
                _ = &mut lifetime => {
                    tracing::info!(connection_id = %self.connection_id, "Relay connection reached max lifetime");
                    return;
                }
                _ = poll.tick() => {
                    if !self.poll_once(deadline).await {
                        return;
                    }
                }
                _ = heartbeat.tick() => {
                    let beat = RelayMessage::Heartbeat(HeartbeatPayload {
                        timestamp: Timestamp::now().as_unix_millis(),
                    });
                    if !self.send(beat, None, deadline).await {
                        return;
                    }
                }
            }
        }
    }

    /// Emits notices for rows past the cursor. Returns false once the
    /// connection must close.
    async fn poll_once(&mut self, deadline: Instant) -> bool {
        let read = self.log.processed_after(self.cursor, self.config.batch_size);
        let rows = match time::timeout_at(deadline, read).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %self.connection_id, cursor = self.cursor, error = %e, "Relay poll failed");
                return true;
            }
            Err(_) => {
                tracing::info!(connection_id = %self.connection_id, "Relay connection reached max lifetime during poll");
                return false;
            }
        };

        for row in rows {
            if row.id <= self.cursor {
                continue;
            }
            let notices = notices_for(&row);
            let last = notices.len().saturating_sub(1);
            for (i, notice) in notices.into_iter().enumerate() {
                let resume_id = (i == last).then_some(row.id);
                if !self.send(RelayMessage::Invalidate(notice), resume_id, deadline).await {
                    return false;
                }
            }
            self.cursor = row.id;
        }
        true
    }

    /// Sends one frame, waiting for channel space no later than `deadline`.
    /// Returns false when the client is gone or the deadline passed.
    async fn send(&self, message: RelayMessage, resume_id: Option<EventId>, deadline: Instant) -> bool {
        match time::timeout_at(deadline, self.tx.send(RelayFrame::new(message, resume_id))).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                tracing::debug!(connection_id = %self.connection_id, "Relay client disconnected");
                false
            }
            Err(_) => {
                tracing::info!(connection_id = %self.connection_id, "Relay connection reached max lifetime while the client was not reading");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEventLog;
    use crate::domain::events::EventStatus;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn config() -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_millis(100),
            heartbeat_interval: Duration::from_millis(1000),
            max_lifetime: Duration::from_secs(10),
            batch_size: 100,
            channel_capacity: 64,
        }
    }

    fn row(id: EventId, event_type: &str, payload: Value) -> LoggedEvent {
        LoggedEvent {
            id,
            event_type: event_type.to_string(),
            payload,
            status: EventStatus::Processed,
            error: None,
            created_at: Timestamp::now(),
        }
    }

    async fn next_invalidate(conn: &mut RelayConnection) -> InvalidationNotice {
        loop {
            match conn.recv().await {
                Some(RelayMessage::Invalidate(notice)) => return notice,
                Some(_) => continue,
                None => panic!("connection closed before an invalidate arrived"),
            }
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Row mapping
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn order_created_maps_to_one_orders_notice() {
        let notices = notices_for(&row(42, "order.created", json!({"id": "o-1"})));

        assert_eq!(
            notices,
            vec![InvalidationNotice {
                table: "orders".to_string(),
                operation: Operation::Insert,
                id: Some("o-1".to_string()),
                cursor: 42,
            }]
        );
    }

    #[test]
    fn payment_fans_out_to_payments_and_orders() {
        let notices = notices_for(&row(7, "payment.notified", json!({"id": "pay-1"})));

        let tables: Vec<_> = notices.iter().map(|n| n.table.as_str()).collect();
        assert_eq!(tables, vec!["payments", "orders"]);
        assert!(notices.iter().all(|n| n.cursor == 7));
    }

    #[test]
    fn unparseable_payload_omits_id() {
        let notices = notices_for(&row(1, "product.deleted", Value::String("{bad".into())));
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.id.is_none()));
        assert!(notices.iter().all(|n| n.operation == Operation::Delete));
    }

    #[test]
    fn unknown_event_type_maps_to_nothing() {
        assert!(notices_for(&row(1, "legacy.thing", json!({}))).is_empty());
    }

    #[test]
    fn parse_cursor_accepts_only_non_negative_integers() {
        assert_eq!(parse_cursor(Some("41")), Some(41));
        assert_eq!(parse_cursor(Some(" 7 ")), Some(7));
        assert_eq!(parse_cursor(Some("-1")), None);
        assert_eq!(parse_cursor(Some("abc")), None);
        assert_eq!(parse_cursor(None), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Connection lifecycle
    // ══════════════════════════════════════════════════════════════

    #[tokio::test(start_paused = true)]
    async fn fresh_connection_starts_at_latest_id() {
        let log = Arc::new(InMemoryEventLog::new());
        log.push_processed("order.created", json!({})).await;
        log.push_processed("order.updated", json!({})).await;
        let relay = InvalidationRelay::with_config(log.clone(), config());

        let mut conn = relay.open(None).await.unwrap();

        assert_eq!(conn.cursor, 2);
        assert_eq!(
            conn.recv().await,
            Some(RelayMessage::Connected(ConnectedPayload { cursor: 2 }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_connection_emits_new_row_with_its_cursor() {
        let log = Arc::new(InMemoryEventLog::new());
        for _ in 0..41 {
            log.push_processed("order.updated", json!({})).await;
        }
        let relay = InvalidationRelay::with_config(log.clone(), config());
        let mut conn = relay.open(Some("41")).await.unwrap();
        assert!(matches!(conn.recv().await, Some(RelayMessage::Connected(_))));

        let id = log.push_processed("payment.notified", json!({"id": "pay-1"})).await;
        assert_eq!(id, 42);

        let first = next_invalidate(&mut conn).await;
        assert_eq!(first.cursor, 42);
        assert_eq!(first.table, "payments");
        assert_eq!(first.operation, Operation::Update);
        let second = next_invalidate(&mut conn).await;
        assert_eq!(second.table, "orders");
    }

    #[tokio::test(start_paused = true)]
    async fn order_created_after_cursor_41_emits_insert_at_42() {
        let log = Arc::new(InMemoryEventLog::new());
        for _ in 0..41 {
            log.push_processed("category.updated", json!({})).await;
        }
        let relay = InvalidationRelay::with_config(log.clone(), config());
        let mut conn = relay.open(Some("41")).await.unwrap();
        conn.recv().await;

        log.push_processed("order.created", json!({"id": "o-42"})).await;

        let notice = next_invalidate(&mut conn).await;
        assert_eq!(notice.cursor, 42);
        assert_eq!(notice.operation, Operation::Insert);
        assert_eq!(notice.id.as_deref(), Some("o-42"));

        // nothing else for row 42 before the next heartbeat
        let next = conn.recv().await.unwrap();
        assert_eq!(next.event_name(), "heartbeat");
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_notice_of_a_row_carries_resume_id() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log.clone(), config());
        let mut conn = relay.open(None).await.unwrap();

        let connected = conn.recv_frame().await.unwrap();
        assert_eq!(connected.resume_id, Some(0));

        log.push_processed("payment.notified", json!({"id": "pay-1"})).await;

        let first = conn.recv_frame().await.unwrap();
        let second = conn.recv_frame().await.unwrap();
        assert!(matches!(first.message, RelayMessage::Invalidate(ref n) if n.table == "payments"));
        assert_eq!(first.resume_id, None);
        assert!(matches!(second.message, RelayMessage::Invalidate(ref n) if n.table == "orders"));
        assert_eq!(second.resume_id, Some(1));

        let beat = conn.recv_frame().await.unwrap();
        assert_eq!(beat.message.event_name(), "heartbeat");
        assert_eq!(beat.resume_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_rows_are_not_streamed_until_processed() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log.clone(), config());
        let mut conn = relay.open(None).await.unwrap();
        conn.recv().await;

        let id = log.append("inventory.adjusted", &json!({"id": "sku-1"})).await.unwrap();
        time::sleep(Duration::from_millis(350)).await;
        log.mark_processed(id).await.unwrap();

        let notice = next_invalidate(&mut conn).await;
        assert_eq!(notice.cursor, id);
        assert_eq!(notice.table, "inventory");
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_flow_on_their_interval() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log, config());
        let mut conn = relay.open(None).await.unwrap();
        conn.recv().await;

        let msg = conn.recv().await.unwrap();
        assert_eq!(msg.event_name(), "heartbeat");
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_cap_closes_connection() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log, config());
        let started = Instant::now();
        let mut conn = relay.open(None).await.unwrap();
        let mut state = conn.state();

        while conn.recv().await.is_some() {}

        state.wait_for(|s| *s == ConnectionState::Closed).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_cap_closes_connection_when_client_stops_reading() {
        let log = Arc::new(InMemoryEventLog::new());
        for _ in 0..5 {
            log.push_processed("payment.notified", json!({})).await;
        }
        let relay = InvalidationRelay::with_config(
            log,
            RelayConfig {
                channel_capacity: 1,
                ..config()
            },
        );
        let started = Instant::now();
        let conn = relay.open(Some("0")).await.unwrap();
        let mut state = conn.state();

        // the receiver is held but never read, so the first send fills the channel
        time::timeout(
            Duration::from_secs(600),
            state.wait_for(|s| *s == ConnectionState::Closed),
        )
        .await
        .expect("connection outlived its lifetime cap")
        .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11));
        drop(conn);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_noticed_while_channel_is_full() {
        let log = Arc::new(InMemoryEventLog::new());
        for _ in 0..5 {
            log.push_processed("payment.notified", json!({})).await;
        }
        let relay = InvalidationRelay::with_config(
            log,
            RelayConfig {
                channel_capacity: 1,
                ..config()
            },
        );
        let started = Instant::now();
        let conn = relay.open(Some("0")).await.unwrap();
        let mut state = conn.state();

        // let the poll fill the channel and block
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*state.borrow(), ConnectionState::Streaming);
        drop(conn);

        state.wait_for(|s| *s == ConnectionState::Closed).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_receiver_closes_connection() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log, config());
        let conn = relay.open(None).await.unwrap();
        let mut state = conn.state();

        drop(conn);

        state.wait_for(|s| *s == ConnectionState::Closed).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_do_not_close_the_connection() {
        let log = Arc::new(InMemoryEventLog::new());
        let relay = InvalidationRelay::with_config(log.clone(), config());
        let mut conn = relay.open(None).await.unwrap();
        conn.recv().await;

        log.set_fail_reads(true);
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*conn.state().borrow(), ConnectionState::Streaming);

        log.set_fail_reads(false);
        log.push_processed("product.created", json!({"id": "p-1"})).await;

        let notice = next_invalidate(&mut conn).await;
        assert_eq!(notice.table, "products");
    }

    #[tokio::test(start_paused = true)]
    async fn connections_keep_independent_cursors() {
        let log = Arc::new(InMemoryEventLog::new());
        log.push_processed("order.updated", json!({})).await;
        let relay = InvalidationRelay::with_config(log.clone(), config());

        let mut replaying = relay.open(Some("0")).await.unwrap();
        let mut fresh = relay.open(None).await.unwrap();
        replaying.recv().await;
        fresh.recv().await;

        assert_eq!(next_invalidate(&mut replaying).await.cursor, 1);

        log.push_processed("order.deleted", json!({})).await;
        assert_eq!(next_invalidate(&mut fresh).await.cursor, 2);
    }

    // ══════════════════════════════════════════════════════════════
    // Cursor monotonicity
    // ══════════════════════════════════════════════════════════════

    /// Returns the same scripted rows on every poll, ignoring the cursor.
    struct ReplayingLog {
        rows: Vec<LoggedEvent>,
    }

    #[async_trait]
    impl EventLog for ReplayingLog {
        async fn append(&self, _: &str, _: &Value) -> Result<EventId, DomainError> {
            Ok(0)
        }
        async fn mark_processed(&self, _: EventId) -> Result<(), DomainError> {
            Ok(())
        }
        async fn mark_failed(&self, _: EventId, _: &str) -> Result<(), DomainError> {
            Ok(())
        }
        async fn latest_id(&self) -> Result<EventId, DomainError> {
            Ok(0)
        }
        async fn processed_after(&self, _: EventId, _: u32) -> Result<Vec<LoggedEvent>, DomainError> {
            Ok(self.rows.clone())
        }
        async fn find(&self, _: EventId) -> Result<Option<LoggedEvent>, DomainError> {
            Ok(None)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn never_emits_at_or_below_an_advanced_cursor(ids in proptest::collection::vec(1i64..50, 1..20)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            rt.block_on(async {
                let rows = ids.iter().map(|id| row(*id, "order.updated", json!({}))).collect();
                let relay = InvalidationRelay::with_config(Arc::new(ReplayingLog { rows }), config());
                let mut conn = relay.open(Some("0")).await.unwrap();

                let mut highest = 0;
                let deadline = Instant::now() + Duration::from_millis(550);
                while Instant::now() < deadline {
                    let msg = tokio::select! {
                        msg = conn.recv() => msg,
                        _ = time::sleep_until(deadline) => None,
                    };
                    match msg {
                        Some(RelayMessage::Invalidate(n)) => {
                            assert!(n.cursor > highest, "cursor {} after {}", n.cursor, highest);
                            highest = n.cursor;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            });
        }
    }
}
