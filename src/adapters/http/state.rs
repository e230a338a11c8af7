//! Shared state for the relay's HTTP surface.

use std::sync::Arc;

use crate::application::{
    BillingWebhookProcessor, EntitlementGate, EventDispatcher, InvalidationRelay,
};
use crate::config::WebhookConfig;
use crate::ports::SessionValidator;

/// Cloned into every request; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub billing: Arc<BillingWebhookProcessor>,
    pub dispatcher: Arc<EventDispatcher>,
    pub gate: EntitlementGate,
    pub relay: Arc<InvalidationRelay>,
    /// `None` runs session-aware routes without authentication.
    pub sessions: Option<Arc<dyn SessionValidator>>,
    pub webhooks: WebhookConfig,
    /// Name of the cookie carrying the session token
    pub session_cookie: Arc<str>,
}

impl AppState {
    pub fn new(
        billing: Arc<BillingWebhookProcessor>,
        dispatcher: Arc<EventDispatcher>,
        gate: EntitlementGate,
        relay: Arc<InvalidationRelay>,
    ) -> Self {
        Self {
            billing,
            dispatcher,
            gate,
            relay,
            sessions: None,
            webhooks: WebhookConfig::default(),
            session_cookie: Arc::from("session"),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionValidator>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_webhooks(mut self, webhooks: WebhookConfig) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn with_session_cookie(mut self, name: impl AsRef<str>) -> Self {
        self.session_cookie = Arc::from(name.as_ref());
        self
    }
}
