//! Shared wiring for the HTTP integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use tenant_relay::adapters::http::AppState;
use tenant_relay::adapters::memory::{InMemoryBillingStore, InMemoryEventLog};
use tenant_relay::application::{
    BillingWebhookProcessor, EntitlementGate, EventDispatcher, HandlerRegistry, InvalidationRelay,
    RelayConfig,
};
use tenant_relay::domain::billing::{build_manifest, sign_manifest};
use tenant_relay::domain::foundation::{DomainError, ErrorCode};
use tenant_relay::ports::{CatalogActions, InventoryActions, OrderActions, PaymentActions};

pub const BILLING_SECRET: &str = "whsec_billing_test";
pub const PAYMENTS_SECRET: &str = "whsec_payments_test";

// =============================================================================
// Host action handlers
// =============================================================================

/// Records every call; fails every call when `failing` is set.
#[derive(Default)]
pub struct RecordingActions {
    calls: Mutex<Vec<(String, Value)>>,
    failing: Mutex<bool>,
}

impl RecordingActions {
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        *self.failing.lock().unwrap() = true;
    }

    fn record(&self, name: &str, payload: &Value) -> Result<Value, DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), payload.clone()));
        if *self.failing.lock().unwrap() {
            return Err(DomainError::new(ErrorCode::HandlerFailed, "handler refused"));
        }
        Ok(json!({"ok": true}))
    }
}

#[async_trait]
impl OrderActions for RecordingActions {
    async fn created(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.created", payload)
    }
    async fn updated(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.updated", payload)
    }
    async fn status_changed(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.status_changed", payload)
    }
    async fn deleted(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.deleted", payload)
    }
    async fn item_added(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.item_added", payload)
    }
    async fn item_removed(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("order.item_removed", payload)
    }
}

#[async_trait]
impl CatalogActions for RecordingActions {
    async fn product_created(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("product.created", payload)
    }
    async fn product_updated(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("product.updated", payload)
    }
    async fn product_deleted(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("product.deleted", payload)
    }
    async fn category_created(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("category.created", payload)
    }
    async fn category_updated(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("category.updated", payload)
    }
    async fn category_deleted(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("category.deleted", payload)
    }
}

#[async_trait]
impl InventoryActions for RecordingActions {
    async fn adjusted(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("inventory.adjusted", payload)
    }
    async fn restocked(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("inventory.restocked", payload)
    }
}

#[async_trait]
impl PaymentActions for RecordingActions {
    async fn notified(&self, payload: &Value) -> Result<Value, DomainError> {
        self.record("payment.notified", payload)
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub store: Arc<InMemoryBillingStore>,
    pub log: Arc<InMemoryEventLog>,
    pub actions: Arc<RecordingActions>,
    pub state: AppState,
}

impl Harness {
    /// Relay polling is shortened so stream tests finish quickly.
    pub fn new(gate_enabled: bool) -> Self {
        let store = Arc::new(InMemoryBillingStore::new());
        let log = Arc::new(InMemoryEventLog::new());
        let actions = Arc::new(RecordingActions::default());

        let billing = BillingWebhookProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        let registry = HandlerRegistry::new(
            actions.clone(),
            actions.clone(),
            actions.clone(),
            actions.clone(),
        );
        let dispatcher = EventDispatcher::new(log.clone(), registry);
        let gate = EntitlementGate::new(store.clone(), gate_enabled);
        let relay = InvalidationRelay::with_config(
            log.clone(),
            RelayConfig {
                poll_interval: std::time::Duration::from_millis(20),
                ..RelayConfig::default()
            },
        );

        let state = AppState::new(
            Arc::new(billing),
            Arc::new(dispatcher),
            gate,
            Arc::new(relay),
        );

        Self {
            store,
            log,
            actions,
            state,
        }
    }
}

// =============================================================================
// Signing
// =============================================================================

/// Builds an `x-signature` value over the canonical manifest.
pub fn sign_canonical(secret: &str, canonical_id: &str, request_id: &str, ts: &str) -> String {
    let manifest = build_manifest(&[("id", canonical_id), ("request-id", request_id), ("ts", ts)]);
    format!("ts={},v1={}", ts, sign_manifest(secret, &manifest).unwrap())
}

/// Builds an `x-signature` value over the legacy body manifest.
pub fn sign_legacy(secret: &str, body: &str, request_id: &str, ts: &str) -> String {
    let manifest = build_manifest(&[("body", body), ("request-id", request_id), ("ts", ts)]);
    format!("ts={},v1={}", ts, sign_manifest(secret, &manifest).unwrap())
}
