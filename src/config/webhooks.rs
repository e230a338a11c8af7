//! Webhook receiver configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Shared secrets for the two webhook receivers.
///
/// A missing secret disables signature checks for that receiver.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub billing_secret: Option<SecretString>,

    #[serde(default)]
    pub payments_secret: Option<SecretString>,
}

impl WebhookConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.billing_secret) {
            return Err(ValidationError::BlankWebhookSecret("billing_secret"));
        }
        if is_blank(&self.payments_secret) {
            return Err(ValidationError::BlankWebhookSecret("payments_secret"));
        }
        Ok(())
    }

    /// Logs a warning for every receiver running without verification.
    pub fn warn_if_unsigned(&self) {
        if self.billing_secret.is_none() {
            tracing::warn!("Billing webhook secret not configured, signatures will not be checked");
        }
        if self.payments_secret.is_none() {
            tracing::warn!("Payments webhook secret not configured, signatures will not be checked");
        }
    }
}

fn is_blank(secret: &Option<SecretString>) -> bool {
    secret
        .as_ref()
        .map(|s| s.expose_secret().trim().is_empty())
        .unwrap_or(false)
}
