//! Configuration loading and representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use licensedesk_licensing::DEFAULT_DURATION_DAYS;

/// Environment variable overriding [`LicenseConfig::default_duration_days`].
pub const DURATION_ENV: &str = "LICENSEDESK_DEFAULT_DURATION_DAYS";

/// Environment variable overriding [`LicenseConfig::max_conflict_retries`].
pub const RETRIES_ENV: &str = "LICENSEDESK_MAX_CONFLICT_RETRIES";

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Tunables for the license lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Lifetime given to licenses created without an explicit duration.
    pub default_duration_days: u32,
    /// How many times a conflicting read-modify-write is re-attempted.
    pub max_conflict_retries: u32,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            default_duration_days: DEFAULT_DURATION_DAYS,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl LicenseConfig {
    /// Load from process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(DURATION_ENV) {
            config.default_duration_days = parse_u32(DURATION_ENV, &raw)?;
        }
        if let Some(raw) = lookup(RETRIES_ENV) {
            config.max_conflict_retries = parse_u32(RETRIES_ENV, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_duration_days == 0 {
            return Err(ConfigError::Invalid {
                name: DURATION_ENV,
                reason: "must be at least 1 day".to_string(),
            });
        }
        Ok(())
    }

    /// Total read-modify-write attempts per operation.
    pub fn max_attempts(&self) -> u32 {
        self.max_conflict_retries.saturating_add(1)
    }
}

fn parse_u32(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = LicenseConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LicenseConfig::default());
        assert_eq!(config.default_duration_days, 365);
        assert_eq!(config.max_attempts(), 4);
    }

    #[test]
    fn overrides_are_parsed() {
        let config =
            LicenseConfig::from_lookup(lookup(&[(DURATION_ENV, "30"), (RETRIES_ENV, " 0 ")]))
                .unwrap();
        assert_eq!(config.default_duration_days, 30);
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = LicenseConfig::from_lookup(lookup(&[(DURATION_ENV, "thirty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: DURATION_ENV, .. }));

        let err = LicenseConfig::from_lookup(lookup(&[(DURATION_ENV, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1 day"));
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: LicenseConfig =
            serde_json::from_str(r#"{ "max_conflict_retries": 5 }"#).unwrap();
        assert_eq!(config.default_duration_days, 365);
        assert_eq!(config.max_conflict_retries, 5);
    }
}
