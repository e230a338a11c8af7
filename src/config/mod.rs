//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `TENANT_RELAY` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use tenant_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod billing;
mod database;
mod error;
mod features;
mod provider;
mod relay;
mod server;
mod webhooks;

pub use auth::AuthConfig;
pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use provider::ProviderConfig;
pub use relay::RelaySettings;
pub use server::{Environment, ServerConfig};
pub use webhooks::WebhookConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection (event log and billing tables)
    pub database: DatabaseConfig,

    #[serde(default)]
    pub webhooks: WebhookConfig,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub billing: BillingConfig,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Provider OAuth client; absent when tenants cannot connect accounts
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `TENANT_RELAY__*` variables:
    ///
    /// - `TENANT_RELAY__SERVER__REQUEST_TIMEOUT_SECS=10` -> `server.request_timeout_secs = 10`
    /// - `TENANT_RELAY__WEBHOOKS__BILLING_SECRET=...` -> `webhooks.billing_secret`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TENANT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.webhooks.validate()?;
        self.billing.validate()?;
        self.relay.validate()?;
        self.auth.validate(&self.server.environment)?;
        if let Some(provider) = &self.provider {
            provider.validate(&self.server.environment)?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TENANT_RELAY__DATABASE__URL",
        "TENANT_RELAY__SERVER__REQUEST_TIMEOUT_SECS",
        "TENANT_RELAY__SERVER__ENVIRONMENT",
        "TENANT_RELAY__FEATURES__ENTITLEMENT_GATE",
        "TENANT_RELAY__BILLING__GRACE_PERIOD_DAYS",
        "TENANT_RELAY__RELAY__POLL_INTERVAL_MS",
        "TENANT_RELAY__WEBHOOKS__BILLING_SECRET",
        "TENANT_RELAY__AUTH__SESSION_SECRET",
    ];

    fn set_minimal_env() {
        env::set_var("TENANT_RELAY__DATABASE__URL", "postgresql://test@localhost/relay");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn minimal_environment_loads_with_defaults() {
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/relay");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(!config.features.entitlement_gate);
        assert_eq!(config.billing.grace_period_days, 7);
        assert_eq!(config.relay.poll_interval_ms, 2000);
        assert!(config.webhooks.billing_secret.is_none());
        assert!(config.provider.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_values_are_read() {
        let config = load_with(&[
            ("TENANT_RELAY__SERVER__REQUEST_TIMEOUT_SECS", "3000"),
            ("TENANT_RELAY__FEATURES__ENTITLEMENT_GATE", "true"),
            ("TENANT_RELAY__BILLING__GRACE_PERIOD_DAYS", "14"),
            ("TENANT_RELAY__RELAY__POLL_INTERVAL_MS", "500"),
            ("TENANT_RELAY__WEBHOOKS__BILLING_SECRET", "whsec_abc"),
        ])
        .unwrap();

        assert_eq!(config.server.request_timeout_secs, 10);
        assert!(config.features.entitlement_gate);
        assert_eq!(config.billing.grace_period_days, 14);
        assert_eq!(config.relay.poll_interval_ms, 500);
        assert!(config.webhooks.billing_secret.is_some());
    }

    #[test]
    fn production_without_session_secret_fails_validation() {
        let config = load_with(&[("TENANT_RELAY__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::SessionSecretRequired));
    }

    #[test]
    fn missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
