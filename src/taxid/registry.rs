//! Jurisdiction → tax-number rule registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::ein::EinValidator;
use super::eu_vat::VatNumberValidator;
use super::format::{DigitPattern, FormatValidator};
use super::lookup::RegistryLookup;
use crate::core::{EngineConfig, RegistryError, SalesTaxError};

/// Member states validated as EU VAT numbers under their own prefix.
const EU_OWN_PREFIX: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "HR", "HU", "IE", "IT", "LT",
    "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];

/// Jurisdictions whose numbers VIES can confirm.
#[cfg(feature = "vies")]
const VIES_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE", "IT",
    "LT", "LU", "LV", "MC", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];

/// Jurisdictions whose numbers HMRC can confirm.
#[cfg(feature = "hmrc")]
const HMRC_COUNTRIES: &[&str] = &["GB", "IM"];

/// How one jurisdiction's tax numbers are validated.
#[derive(Clone)]
pub struct TaxNumberRule {
    pub format: Arc<dyn FormatValidator>,
    /// Registry confirming format-valid numbers when fraud checks are on.
    pub lookup: Option<Arc<dyn RegistryLookup>>,
}

impl TaxNumberRule {
    pub fn new(format: impl FormatValidator + 'static) -> Self {
        Self {
            format: Arc::new(format),
            lookup: None,
        }
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn RegistryLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }
}

impl fmt::Debug for TaxNumberRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxNumberRule")
            .field("lookup", &self.lookup.as_ref().map(|l| l.name()))
            .finish_non_exhaustive()
    }
}

/// Tax-number rules keyed by upper-case jurisdiction code.
///
/// Jurisdictions without a rule never validate.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    rules: HashMap<String, TaxNumberRule>,
}

impl ValidatorRegistry {
    /// Registry without any rule.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Format and check-digit rules for every supported jurisdiction,
    /// without registry lookups.
    pub fn offline() -> Self {
        let mut registry = Self::empty();

        registry.register("US", TaxNumberRule::new(EinValidator));
        registry.register("CA", TaxNumberRule::new(DigitPattern::new(9)));

        for &country in EU_OWN_PREFIX {
            registry.register(country, TaxNumberRule::new(VatNumberValidator::own_prefix()));
        }
        registry.register("GR", TaxNumberRule::new(VatNumberValidator::accepting(&["EL"])));
        registry.register("MC", TaxNumberRule::new(VatNumberValidator::accepting(&["FR"])));
        registry.register("GB", TaxNumberRule::new(VatNumberValidator::own_prefix()));
        registry.register("IM", TaxNumberRule::new(VatNumberValidator::accepting(&["GB"])));

        registry
    }

    /// Offline rules plus the registry lookups enabled at compile time
    /// (`vies`, `hmrc` features). The HMRC lookup is attached only when
    /// `config.hmrc_bearer_token` is set.
    #[cfg_attr(
        not(any(feature = "vies", feature = "hmrc")),
        allow(unused_variables, unused_mut)
    )]
    pub fn standard(config: &EngineConfig) -> Result<Self, SalesTaxError> {
        let mut registry = Self::offline();

        #[cfg(feature = "vies")]
        {
            let vies = super::vies::ViesClient::new(config.registry_timeout())?;
            registry.attach_lookup(VIES_COUNTRIES, Arc::new(vies));
        }

        // HMRC answers 401/403 without OAuth, so GB/IM stay offline without a token.
        #[cfg(feature = "hmrc")]
        {
            match config.hmrc_bearer_token.clone() {
                Some(token) => {
                    let hmrc = super::hmrc::HmrcClient::new(config.registry_timeout())?
                        .with_bearer_token(Some(token));
                    registry.attach_lookup(HMRC_COUNTRIES, Arc::new(hmrc));
                }
                None => tracing::warn!(
                    countries = ?HMRC_COUNTRIES,
                    "no HMRC bearer token configured, fraud check skipped for these countries"
                ),
            }
        }

        Ok(registry)
    }

    /// Add or replace the rule for `country_code`, returning the old one.
    pub fn register(
        &mut self,
        country_code: &str,
        rule: TaxNumberRule,
    ) -> Option<TaxNumberRule> {
        self.rules.insert(country_code.to_ascii_uppercase(), rule)
    }

    pub fn with_rule(mut self, country_code: &str, rule: TaxNumberRule) -> Self {
        self.register(country_code, rule);
        self
    }

    /// Attach `lookup` to the existing rules of `countries`.
    pub fn attach_lookup(&mut self, countries: &[&str], lookup: Arc<dyn RegistryLookup>) {
        for country in countries {
            if let Some(rule) = self.rules.get_mut(&country.to_ascii_uppercase()) {
                rule.lookup = Some(Arc::clone(&lookup));
            }
        }
    }

    pub fn rule(&self, country_code: &str) -> Option<&TaxNumberRule> {
        self.rules.get(country_code)
    }

    /// Validate a cleaned tax number for `country_code` (upper-case).
    ///
    /// With `fraud_check`, a format-valid number is also confirmed against
    /// the jurisdiction's registry, bounded by `timeout`. Registry failures
    /// are errors, never `false`.
    pub async fn validate(
        &self,
        country_code: &str,
        number: &str,
        fraud_check: bool,
        timeout: Duration,
    ) -> Result<bool, SalesTaxError> {
        let Some(rule) = self.rule(country_code) else {
            tracing::debug!(country = country_code, "no tax number rule for jurisdiction");
            return Ok(false);
        };

        let parts = match rule.format.validate(country_code, number) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::debug!(country = country_code, reason = %e.reason, "tax number rejected");
                return Ok(false);
            }
        };

        let lookup = match (&rule.lookup, fraud_check) {
            (Some(lookup), true) => lookup,
            _ => return Ok(true),
        };

        let registry_country = parts.prefix.as_deref().unwrap_or(country_code);
        let span = tracing::debug_span!(
            "registry_lookup",
            registry = lookup.name(),
            country = registry_country
        );
        let check = lookup.is_registered(registry_country, &parts.local);

        match tokio::time::timeout(timeout, check).instrument(span).await {
            Ok(Ok(registered)) => {
                tracing::debug!(registered, "registry answered");
                Ok(registered)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "registry lookup failed");
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "registry lookup timed out");
                Err(RegistryError::Timeout(timeout.as_secs()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        answer: bool,
        seen: parking_lot::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RegistryLookup for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn is_registered(
            &self,
            country_code: &str,
            number: &str,
        ) -> Result<bool, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .push((country_code.to_string(), number.to_string()));
            Ok(self.answer)
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(20);

    #[tokio::test]
    async fn unknown_jurisdiction_is_invalid() {
        let registry = ValidatorRegistry::offline();
        assert!(!registry.validate("JP", "1234567890123", false, TIMEOUT).await.unwrap());
    }

    #[tokio::test]
    async fn offline_rules() {
        let registry = ValidatorRegistry::offline();
        assert!(registry.validate("FR", "FR87524172699", false, TIMEOUT).await.unwrap());
        assert!(registry.validate("US", "01-1234567", false, TIMEOUT).await.unwrap());
        assert!(registry.validate("CA", "123456789", false, TIMEOUT).await.unwrap());
        assert!(registry.validate("GR", "EL094300033", false, TIMEOUT).await.unwrap());
        assert!(registry.validate("IM", "GB980234718", false, TIMEOUT).await.unwrap());
        assert!(!registry.validate("DE", "FR87524172699", false, TIMEOUT).await.unwrap());
    }

    #[tokio::test]
    async fn lookup_receives_prefix_and_local_part() {
        let recorder = Arc::new(Recorder {
            answer: true,
            ..Default::default()
        });
        let mut registry = ValidatorRegistry::offline();
        registry.attach_lookup(&["GR"], recorder.clone());

        assert!(registry.validate("GR", "EL094300033", true, TIMEOUT).await.unwrap());
        assert_eq!(
            recorder.seen.lock().as_slice(),
            &[("EL".to_string(), "094300033".to_string())]
        );
    }

    #[tokio::test]
    async fn lookup_skipped_without_fraud_check() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = ValidatorRegistry::offline();
        registry.attach_lookup(&["FR"], recorder.clone());

        assert!(registry.validate("FR", "FR87524172699", false, TIMEOUT).await.unwrap());
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lookup_skipped_for_format_invalid_numbers() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = ValidatorRegistry::offline();
        registry.attach_lookup(&["FR"], recorder.clone());

        assert!(!registry.validate("FR", "FR88524172699", true, TIMEOUT).await.unwrap());
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn registry_denial_is_false() {
        let mut registry = ValidatorRegistry::offline();
        registry.attach_lookup(&["FR"], Arc::new(Recorder::default()));
        assert!(!registry.validate("FR", "FR87524172699", true, TIMEOUT).await.unwrap());
    }

    #[test]
    fn attach_lookup_ignores_unregistered_countries() {
        let mut registry = ValidatorRegistry::empty();
        registry.attach_lookup(&["FR"], Arc::new(Recorder::default()));
        assert!(registry.rule("FR").is_none());
    }

    #[test]
    fn register_replaces_rule() {
        let mut registry = ValidatorRegistry::offline();
        let old = registry.register("ca", TaxNumberRule::new(DigitPattern::new(15)));
        assert!(old.is_some());
        assert!(registry.rule("CA").is_some());
    }
}
