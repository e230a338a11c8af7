//! Integration tests for the relay's server-sent events endpoint, and the
//! invalidation client running against it over a real socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::json;
use tower::ServiceExt;

use common::Harness;
use tenant_relay::adapters::auth::MockSessionValidator;
use tenant_relay::adapters::http::api_router;
use tenant_relay::adapters::invalidation::{
    HttpStreamConnector, InvalidationClient, QueryCache, SseDecoder, SseFrame,
};
use tenant_relay::config::ServerConfig;
use tenant_relay::domain::events::{DomainEventType, InvalidationNotice, Operation, RelayMessage};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn router(harness: &Harness) -> Router {
    api_router(harness.state.clone(), &ServerConfig::default())
}

fn stream_request(uri: &str, last_event_id: Option<&str>) -> Request<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(id) = last_event_id {
        request = request.header("last-event-id", id);
    }
    request.body(Body::empty()).unwrap()
}

/// Reads decoded relay messages from an SSE body until `done` says stop.
async fn read_until(
    body: Body,
    mut done: impl FnMut(&[RelayMessage]) -> bool,
) -> Vec<RelayMessage> {
    let mut chunks = body.into_data_stream();
    let mut decoder = SseDecoder::new();
    let mut messages = Vec::new();

    let read = async {
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.unwrap();
            for frame in decoder.push(&chunk) {
                if let Some(message) = RelayMessage::decode(&frame.event, &frame.data) {
                    messages.push(message);
                }
            }
            if done(&messages) {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("relay stream stalled");
    messages
}

fn invalidations(messages: &[RelayMessage]) -> Vec<InvalidationNotice> {
    messages
        .iter()
        .filter_map(|m| match m {
            RelayMessage::Invalidate(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Stream endpoint
// =============================================================================

#[tokio::test]
async fn stream_opens_with_connected_at_latest_cursor() {
    let harness = Harness::new(false);
    for _ in 0..3 {
        harness.log.push_processed("product.updated", json!({})).await;
    }

    let response = router(&harness)
        .oneshot(stream_request("/api/realtime/stream", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let messages = read_until(response.into_body(), |m| !m.is_empty()).await;
    match &messages[0] {
        RelayMessage::Connected(c) => assert_eq!(c.cursor, 3),
        other => panic!("expected connected, got {other:?}"),
    }
}

#[tokio::test]
async fn resumes_after_last_event_id() {
    let harness = Harness::new(false);
    for _ in 0..41 {
        harness.log.push_processed("category.updated", json!({})).await;
    }

    let response = router(&harness)
        .oneshot(stream_request("/api/realtime/stream", Some("41")))
        .await
        .unwrap();
    harness
        .log
        .push_processed("order.created", json!({"id": "o-42"}))
        .await;
    harness
        .log
        .push_processed("product.updated", json!({"id": "p-1"}))
        .await;

    let messages = read_until(response.into_body(), |m| {
        invalidations(m).iter().any(|n| n.cursor == 43)
    })
    .await;

    assert!(matches!(messages[0], RelayMessage::Connected(c) if c.cursor == 41));
    let notices: Vec<_> = invalidations(&messages)
        .into_iter()
        .filter(|n| n.cursor == 42)
        .collect();
    assert_eq!(
        notices,
        vec![InvalidationNotice {
            table: "orders".to_string(),
            operation: Operation::Insert,
            id: Some("o-42".to_string()),
            cursor: 42,
        }]
    );
}

#[tokio::test]
async fn sse_id_is_set_only_once_a_row_is_complete() {
    let harness = Harness::new(false);
    let response = router(&harness)
        .oneshot(stream_request("/api/realtime/stream", None))
        .await
        .unwrap();
    harness
        .log
        .push_processed("payment.notified", json!({"id": "pay-1"}))
        .await;

    let mut chunks = response.into_body().into_data_stream();
    let mut decoder = SseDecoder::new();
    let mut frames: Vec<SseFrame> = Vec::new();
    let read = async {
        while frames.iter().filter(|f| f.event == "invalidate").count() < 2 {
            let chunk = chunks.next().await.unwrap().unwrap();
            frames.extend(decoder.push(&chunk));
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("relay stream stalled");

    let ids: Vec<(String, Option<String>)> = frames
        .into_iter()
        .map(|f| (f.event, f.id))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("connected".to_string(), Some("0".to_string())),
            ("invalidate".to_string(), None),
            ("invalidate".to_string(), Some("1".to_string())),
        ]
    );
}

#[tokio::test]
async fn dispatched_action_reaches_open_stream() {
    let harness = Harness::new(false);
    let response = router(&harness)
        .oneshot(stream_request("/api/realtime/stream", None))
        .await
        .unwrap();

    harness
        .state
        .dispatcher
        .dispatch(DomainEventType::InventoryRestocked, json!({"sku": "sku-9"}))
        .await
        .unwrap();

    let messages = read_until(response.into_body(), |m| invalidations(m).len() >= 2).await;
    let tables: Vec<String> = invalidations(&messages)
        .into_iter()
        .map(|n| n.table)
        .collect();
    assert_eq!(tables, vec!["inventory".to_string(), "products".to_string()]);
}

#[tokio::test]
async fn stream_requires_token_when_sessions_configured() {
    let mut harness = Harness::new(false);
    harness.state = harness.state.clone().with_sessions(Arc::new(
        MockSessionValidator::new().with_test_user("tok-1", "user-1", "t1"),
    ));
    let app = router(&harness);

    let anonymous = app
        .clone()
        .oneshot(stream_request("/api/realtime/stream", None))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let bad = app
        .clone()
        .oneshot(stream_request("/api/realtime/stream?token=nope", None))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    let authorized = app
        .oneshot(stream_request("/api/realtime/stream?token=tok-1", None))
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);
}

#[tokio::test]
async fn unreadable_log_answers_service_unavailable() {
    let harness = Harness::new(false);
    harness.log.set_fail_reads(true);

    let response = router(&harness)
        .oneshot(stream_request("/api/realtime/stream", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Client against a live relay
// =============================================================================

#[tokio::test]
async fn client_evicts_cache_entries_for_dispatched_orders() {
    let harness = Harness::new(false);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(&harness);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let cache = Arc::new(QueryCache::new());
    cache.insert("orders:list", json!([]));
    cache.insert("dashboard:summary", json!({}));
    cache.insert("catalog:tree", json!({}));

    let connector = HttpStreamConnector::new(format!("http://{}/api/realtime/stream", addr));
    let handle = InvalidationClient::new(Arc::new(connector), cache.clone()).spawn();

    // wait for the stream to be live before producing the event
    let mut state = handle.state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == tenant_relay::adapters::invalidation::ClientState::Live),
    )
    .await
    .unwrap()
    .unwrap();

    harness
        .state
        .dispatcher
        .dispatch(DomainEventType::PaymentNotified, json!({"id": "pay-1"}))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.contains("orders:list") || cache.contains("dashboard:summary") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cache was not invalidated");

    assert!(cache.contains("catalog:tree"));
    handle.shutdown().await;
}
