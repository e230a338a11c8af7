//! Billing configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::DEFAULT_GRACE_PERIOD_DAYS;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Days a lapsed subscription keeps its features
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,
}

impl BillingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=90).contains(&self.grace_period_days) {
            return Err(ValidationError::InvalidGracePeriod);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    DEFAULT_GRACE_PERIOD_DAYS
}
