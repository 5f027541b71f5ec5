//! Engine configuration.
//!
//! Loaded once at startup, either programmatically, from serde (e.g. a
//! section of the host application's config file) or from environment
//! variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SALESTAX_ORIGIN_COUNTRY` | unset |
//! | `SALESTAX_USE_REGIONAL_TAX` | `true` |
//! | `SALESTAX_VALIDATE_TAX_NUMBERS` | `true` |
//! | `SALESTAX_FRAUD_CHECK` | `false` |
//! | `SALESTAX_REGISTRY_TIMEOUT_SECS` | `20` |
//! | `SALESTAX_HMRC_TOKEN` | unset |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SalesTaxError;

pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 20;

/// Startup configuration of a [`SalesTax`](crate::engine::SalesTax) engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seller's country; unset means every sale is worldwide.
    pub origin_country: Option<String>,
    /// When false, regional buyers pay the origin's national rate.
    pub use_regional_tax: bool,
    /// When false, every supplied tax number is considered valid.
    pub validate_tax_numbers: bool,
    /// Confirm format-valid numbers against the national registry.
    pub fraud_check: bool,
    pub registry_timeout_secs: u64,
    /// OAuth bearer token for the HMRC VAT lookup API.
    #[serde(skip_serializing)]
    pub hmrc_bearer_token: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin_country: None,
            use_regional_tax: true,
            validate_tax_numbers: true,
            fraud_check: false,
            registry_timeout_secs: DEFAULT_REGISTRY_TIMEOUT_SECS,
            hmrc_bearer_token: None,
        }
    }
}

impl EngineConfig {
    /// Read `SALESTAX_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, SalesTaxError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read `SALESTAX_*` keys through `lookup` over the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SalesTaxError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let flag = |key: &str, default: bool| match non_empty(key) {
            Some(v) => parse_bool(key, &v),
            None => Ok(default),
        };

        let registry_timeout_secs = match non_empty("SALESTAX_REGISTRY_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                SalesTaxError::Config(format!(
                    "SALESTAX_REGISTRY_TIMEOUT_SECS must be a whole number of seconds, got '{v}'"
                ))
            })?,
            None => defaults.registry_timeout_secs,
        };

        Ok(Self {
            origin_country: non_empty("SALESTAX_ORIGIN_COUNTRY")
                .map(|c| c.trim().to_ascii_uppercase()),
            use_regional_tax: flag("SALESTAX_USE_REGIONAL_TAX", defaults.use_regional_tax)?,
            validate_tax_numbers: flag(
                "SALESTAX_VALIDATE_TAX_NUMBERS",
                defaults.validate_tax_numbers,
            )?,
            fraud_check: flag("SALESTAX_FRAUD_CHECK", defaults.fraud_check)?,
            registry_timeout_secs,
            hmrc_bearer_token: non_empty("SALESTAX_HMRC_TOKEN"),
        })
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    /// Runtime settings this configuration starts the engine with.
    pub fn settings(&self) -> Settings {
        Settings {
            origin_country: self
                .origin_country
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_ascii_uppercase),
            use_regional_tax: self.use_regional_tax,
            validate_tax_numbers: self.validate_tax_numbers,
            fraud_check: self.fraud_check,
        }
    }
}

/// Mutable engine settings, read as one snapshot per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub origin_country: Option<String>,
    pub use_regional_tax: bool,
    pub validate_tax_numbers: bool,
    pub fraud_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        EngineConfig::default().settings()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SalesTaxError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SalesTaxError::Config(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.registry_timeout(), Duration::from_secs(20));
        assert!(config.settings().origin_country.is_none());
    }

    #[test]
    fn reads_all_keys() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SALESTAX_ORIGIN_COUNTRY", " fr "),
            ("SALESTAX_USE_REGIONAL_TAX", "no"),
            ("SALESTAX_VALIDATE_TAX_NUMBERS", "0"),
            ("SALESTAX_FRAUD_CHECK", "TRUE"),
            ("SALESTAX_REGISTRY_TIMEOUT_SECS", "5"),
            ("SALESTAX_HMRC_TOKEN", "abc"),
        ]))
        .unwrap();

        assert_eq!(config.origin_country.as_deref(), Some("FR"));
        assert!(!config.use_regional_tax);
        assert!(!config.validate_tax_numbers);
        assert!(config.fraud_check);
        assert_eq!(config.registry_timeout_secs, 5);
        assert_eq!(config.hmrc_bearer_token.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_bool_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[("SALESTAX_FRAUD_CHECK", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("SALESTAX_FRAUD_CHECK"));
    }

    #[test]
    fn invalid_timeout_rejected() {
        assert!(
            EngineConfig::from_lookup(lookup(&[("SALESTAX_REGISTRY_TIMEOUT_SECS", "soon")]))
                .is_err()
        );
    }

    #[test]
    fn empty_origin_means_unset() {
        let config = EngineConfig {
            origin_country: Some("  ".into()),
            ..EngineConfig::default()
        };
        assert!(config.settings().origin_country.is_none());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"origin_country":"es","use_regional_tax":false}"#).unwrap();
        assert_eq!(config.settings().origin_country.as_deref(), Some("ES"));
        assert!(!config.use_regional_tax);
        assert!(config.validate_tax_numbers);
    }
}
