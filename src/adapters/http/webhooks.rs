//! Inbound provider webhook receivers.
//!
//! Both receivers read the raw body before parsing (the signature covers
//! it) and always answer `200 {"received": true}`. Failures only show up as
//! an `error` code in the body so the provider never enters its retry cycle.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::state::AppState;
use crate::application::BillingOutcome;
use crate::domain::billing::{SignatureVerifier, WebhookError};
use crate::domain::events::DomainEventType;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Acknowledgement body returned for every delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self {
            received: true,
            error: None,
        }
    }

    pub fn rejected(err: &WebhookError) -> Self {
        Self {
            received: true,
            error: Some(err.code()),
        }
    }
}

impl From<Result<(), WebhookError>> for WebhookAck {
    fn from(result: Result<(), WebhookError>) -> Self {
        match result {
            Ok(()) => WebhookAck::ok(),
            Err(e) => WebhookAck::rejected(&e),
        }
    }
}

/// Identifier signed by the canonical manifest: query `data.id`, then body
/// `data.id`, then body `id`, then body `externalEventId`.
pub fn canonical_id(uri: &Uri, body: Option<&Value>) -> String {
    let from_query = Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(params)| params.get("data.id").cloned())
        .filter(|id| !id.is_empty());
    if let Some(id) = from_query {
        return id;
    }

    let Some(body) = body else {
        return String::new();
    };
    let candidates = [
        body.get("data").and_then(|d| d.get("id")),
        body.get("id"),
        body.get("externalEventId"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(id_string)
        .unwrap_or_default()
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Checks the delivery signature. A receiver without a secret accepts
/// everything and warns.
fn verify_delivery(
    receiver: &'static str,
    secret: Option<&SecretString>,
    headers: &HeaderMap,
    raw_body: &str,
    canonical_id: &str,
) -> Result<(), WebhookError> {
    let Some(secret) = secret else {
        tracing::warn!(receiver, "Webhook secret not configured, accepting unsigned delivery");
        return Ok(());
    };

    let signature = header_str(headers, SIGNATURE_HEADER);
    let request_id = header_str(headers, REQUEST_ID_HEADER);

    if SignatureVerifier::verify(
        signature,
        request_id,
        raw_body,
        canonical_id,
        secret.expose_secret(),
    ) {
        Ok(())
    } else {
        tracing::warn!(receiver, request_id, "Invalid webhook signature");
        Err(WebhookError::InvalidSignature)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Verifies and parses a delivery body.
fn authenticate(
    receiver: &'static str,
    secret: Option<&SecretString>,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Value, WebhookError> {
    let raw = std::str::from_utf8(body).map_err(|e| {
        tracing::warn!(receiver, error = %e, "Webhook body is not UTF-8");
        WebhookError::InvalidJson(e.to_string())
    })?;
    let parsed = serde_json::from_str::<Value>(raw);
    let canonical = canonical_id(uri, parsed.as_ref().ok());

    verify_delivery(receiver, secret, headers, raw, &canonical)?;

    parsed.map_err(|e| {
        tracing::warn!(receiver, error = %e, "Webhook body is not JSON");
        WebhookError::from(e)
    })
}

/// `POST /webhooks/billing`
pub async fn billing_webhook(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let result = receive_billing(&state, &uri, &headers, &body).await;
    Json(result.into())
}

async fn receive_billing(
    state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), WebhookError> {
    let payload = authenticate(
        "billing",
        state.webhooks.billing_secret.as_ref(),
        uri,
        headers,
        body,
    )?;

    match state.billing.process(&payload).await {
        Ok(BillingOutcome::Invalid(reason)) => Err(WebhookError::InvalidPayload(reason)),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!(error = %e, "Billing webhook processing failed");
            Err(e.into())
        }
    }
}

/// `POST /webhooks/payments`
pub async fn payments_webhook(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let result = receive_payment(&state, &uri, &headers, &body).await;
    Json(result.into())
}

async fn receive_payment(
    state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(), WebhookError> {
    let payload = authenticate(
        "payments",
        state.webhooks.payments_secret.as_ref(),
        uri,
        headers,
        body,
    )?;

    // dispatch already logged and recorded the failure
    state
        .dispatcher
        .dispatch(DomainEventType::PaymentNotified, payload)
        .await
        .map(|_| ())
        .map_err(WebhookError::from)
}
