//! Invalidation relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::RelayConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Connections are closed after this long; clients reconnect with their cursor.
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,

    /// Rows read per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl RelaySettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::ZeroRelaySetting("poll_interval_ms"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ValidationError::ZeroRelaySetting("heartbeat_interval_ms"));
        }
        if self.max_lifetime_secs == 0 {
            return Err(ValidationError::ZeroRelaySetting("max_lifetime_secs"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::ZeroRelaySetting("batch_size"));
        }

        let lifetime_ms = self.max_lifetime_secs.saturating_mul(1000);
        if self.poll_interval_ms >= lifetime_ms {
            return Err(ValidationError::RelayIntervalTooLong("poll"));
        }
        if self.heartbeat_interval_ms >= lifetime_ms {
            return Err(ValidationError::RelayIntervalTooLong("heartbeat"));
        }
        Ok(())
    }

    /// Runtime settings for `InvalidationRelay`.
    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            max_lifetime: Duration::from_secs(self.max_lifetime_secs),
            batch_size: self.batch_size,
            ..RelayConfig::default()
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            max_lifetime_secs: default_max_lifetime_secs(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_heartbeat_interval_ms() -> u64 {
    25_000
}

fn default_max_lifetime_secs() -> u64 {
    300
}

fn default_batch_size() -> u32 {
    100
}
