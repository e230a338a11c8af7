//! Session authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for session tokens. Without it the relay stream runs unauthenticated.
    #[serde(default)]
    pub session_secret: Option<SecretString>,

    /// Cookie carrying the session token for browser clients
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl AuthConfig {
    /// Session auth is enabled when a non-blank secret is configured.
    pub fn sessions_enabled(&self) -> bool {
        self.session_secret
            .as_ref()
            .map(|s| !s.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }

    /// Production deployments must authenticate the relay stream.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.session_cookie.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__SESSION_COOKIE"));
        }
        if *environment == Environment::Production && !self.sessions_enabled() {
            return Err(ValidationError::SessionSecretRequired);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_session_cookie() -> String {
    "session".to_string()
}
