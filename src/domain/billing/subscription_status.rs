//! Subscription status shared by subscriptions and entitlements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Tenant subscription status as reported by the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription on record.
    None,

    /// Paid and current.
    Active,

    /// Latest charge failed; provider is retrying.
    PastDue,

    /// Lapsed but features stay on until the grace window closes.
    GracePeriod,

    /// Canceled by the tenant or the provider.
    Canceled,

    /// Ended. Features are off.
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::None,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::GracePeriod,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::GracePeriod => "grace_period",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Terminal subscriptions are closed out; a later event opens a new row.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Expired)
    }

    /// Returns true if tenants in this status get premium features.
    pub fn grants_features(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::GracePeriod)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{}'", s))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_canceled_and_expired_are_terminal() {
        let terminal: Vec<_> = SubscriptionStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![&SubscriptionStatus::Canceled, &SubscriptionStatus::Expired]
        );
    }

    #[test]
    fn only_active_and_grace_period_grant_features() {
        let granting: Vec<_> = SubscriptionStatus::ALL
            .iter()
            .filter(|s| s.grants_features())
            .collect();
        assert_eq!(
            granting,
            vec![&SubscriptionStatus::Active, &SubscriptionStatus::GracePeriod]
        );
    }

    #[test]
    fn parses_every_stored_name() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::GracePeriod).unwrap();
        assert_eq!(json, "\"grace_period\"");
    }
}
