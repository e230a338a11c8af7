//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Grace period must be between 1 and 90 days")]
    InvalidGracePeriod,

    #[error("Relay setting must be non-zero: {0}")]
    ZeroRelaySetting(&'static str),

    #[error("Relay {0} interval must be shorter than the connection lifetime")]
    RelayIntervalTooLong(&'static str),

    #[error("Webhook secret must not be blank: {0}")]
    BlankWebhookSecret(&'static str),

    #[error("Provider URL must use HTTPS in production: {0}")]
    ProviderUrlMustBeHttps(&'static str),

    #[error("Session secret is required in production")]
    SessionSecretRequired,
}
