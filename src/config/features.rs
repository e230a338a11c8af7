//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    /// Enforce tenant entitlements. Off means every tenant is allowed.
    #[serde(default)]
    pub entitlement_gate: bool,

    /// Include error detail in HTTP error bodies (keep off in production)
    #[serde(default)]
    pub verbose_errors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_is_off_by_default() {
        let flags = FeatureFlags::default();
        assert!(!flags.entitlement_gate);
        assert!(!flags.verbose_errors);
    }

    #[test]
    fn flags_deserialize_with_missing_fields() {
        let flags: FeatureFlags = serde_json::from_str(r#"{"entitlement_gate": true}"#).unwrap();
        assert!(flags.entitlement_gate);
        assert!(!flags.verbose_errors);
    }
}
