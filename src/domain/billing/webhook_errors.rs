//! Webhook error types for inbound provider notifications.
//!
//! Every variant is acknowledged to the provider with a success status; the
//! error only surfaces as a short code in the acknowledgement body.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};

/// Errors that stop processing of one webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header missing, malformed, or not matching.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Body is JSON but not a valid envelope.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Business processing failed after validation.
    #[error("Processing failed: {0}")]
    Processing(String),
}

impl WebhookError {
    /// Short code embedded in the acknowledgement body.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::InvalidJson(_) => "invalid_json",
            WebhookError::InvalidPayload(_) => "invalid_payload",
            WebhookError::Processing(_) => "processing_failed",
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidJson(err.to_string())
    }
}

impl From<ValidationError> for WebhookError {
    fn from(err: ValidationError) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Processing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn codes_are_stable() {
        assert_eq!(WebhookError::InvalidSignature.code(), "invalid_signature");
        assert_eq!(WebhookError::InvalidJson(String::new()).code(), "invalid_json");
        assert_eq!(WebhookError::InvalidPayload(String::new()).code(), "invalid_payload");
        assert_eq!(WebhookError::Processing(String::new()).code(), "processing_failed");
    }

    #[test]
    fn conversions_pick_the_right_variant() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(WebhookError::from(json_err), WebhookError::InvalidJson(_)));

        let validation = ValidationError::empty_field("tenantId");
        assert!(matches!(WebhookError::from(validation), WebhookError::InvalidPayload(_)));

        let domain = DomainError::new(ErrorCode::DatabaseError, "down");
        assert!(matches!(WebhookError::from(domain), WebhookError::Processing(_)));
    }
}
