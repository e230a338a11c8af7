//! Payment provider OAuth configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// OAuth client settings for connecting a tenant's provider account.
///
/// The whole section is optional; without it the OAuth client is not built.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub token_url: String,

    pub user_info_url: String,

    pub client_id: String,

    pub client_secret: SecretString,

    /// Hard limit on each outbound call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.token_url.is_empty() {
            return Err(ValidationError::MissingRequired("PROVIDER__TOKEN_URL"));
        }
        if self.user_info_url.is_empty() {
            return Err(ValidationError::MissingRequired("PROVIDER__USER_INFO_URL"));
        }
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("PROVIDER__CLIENT_ID"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if *environment == Environment::Production {
            if !self.token_url.starts_with("https://") {
                return Err(ValidationError::ProviderUrlMustBeHttps("token_url"));
            }
            if !self.user_info_url.starts_with("https://") {
                return Err(ValidationError::ProviderUrlMustBeHttps("user_info_url"));
            }
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    20
}
