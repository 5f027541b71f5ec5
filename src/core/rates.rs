//! Jurisdiction tax tables and time-aware rate resolution.
//!
//! A table maps ISO 3166-1 alpha-2 country codes to a [`JurisdictionTaxEntry`],
//! optionally with subdivision entries (states, provinces) and a schedule of
//! past or planned rate changes.
//!
//! The JSON shape is:
//!
//! ```json
//! {
//!   "CA": {
//!     "type": "gst", "rate": 0.05, "currency": "CAD",
//!     "states": {
//!       "QC": { "type": "qst", "rate": 0.09975 },
//!       "NS": { "type": "hst", "rate": 0.09, "before": { "2025-04-01T00:00:00Z": { "rate": 0.10 } } }
//!     }
//!   }
//! }
//! ```
//!
//! A `before` entry keyed at instant `D` is the rate in force strictly before
//! `D`. When several boundaries lie ahead of the resolution instant, the
//! earliest one wins; once all boundaries have passed the base rate applies.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::SalesTaxError;
use super::types::TAX_TYPE_NONE;

const BUNDLED_RATES: &str = include_str!("../../res/sales_tax_rates.json");

/// A rate in force until a scheduled boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRate {
    /// Type label; inherits the base entry's label when `None`.
    pub tax_type: Option<String>,
    pub rate: Decimal,
}

/// Tax rule for a country or a country subdivision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionTaxEntry {
    pub tax_type: String,
    /// Fraction in `[0, 1)`.
    pub rate: Decimal,
    pub currency: Option<String>,
    /// Subdivision code → entry. Subdivisions never inherit the parent rate.
    pub subdivisions: HashMap<String, JurisdictionTaxEntry>,
    /// Boundary instant → rate in force strictly before it.
    pub scheduled: BTreeMap<DateTime<Utc>, ScheduledRate>,
}

impl JurisdictionTaxEntry {
    pub fn new(tax_type: impl Into<String>, rate: Decimal) -> Self {
        Self {
            tax_type: tax_type.into(),
            rate,
            currency: None,
            subdivisions: HashMap::new(),
            scheduled: BTreeMap::new(),
        }
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = Some(code.into());
        self
    }

    pub fn subdivision(mut self, code: impl Into<String>, entry: JurisdictionTaxEntry) -> Self {
        self.subdivisions
            .insert(code.into().to_ascii_uppercase(), entry);
        self
    }

    /// Schedule `rate` as the rate in force before `boundary` (RFC 3339).
    ///
    /// # Errors
    ///
    /// Returns `SalesTaxError::Config` if `boundary` is not a valid instant
    /// or `rate` lies outside `[0, 1)`.
    pub fn before(
        mut self,
        boundary: &str,
        tax_type: Option<&str>,
        rate: Decimal,
    ) -> Result<Self, SalesTaxError> {
        let at = parse_boundary(boundary)?;
        check_rate(&format!("schedule before {boundary}"), rate)?;
        self.scheduled.insert(
            at,
            ScheduledRate {
                tax_type: tax_type.map(str::to_string),
                rate,
            },
        );
        Ok(self)
    }

    /// Check this entry, its schedule and its subdivisions against `[0, 1)`.
    fn validate(&self, path: &str) -> Result<(), SalesTaxError> {
        check_rate(path, self.rate)?;
        for (boundary, scheduled) in &self.scheduled {
            check_rate(
                &format!("{path} before {}", boundary.to_rfc3339()),
                scheduled.rate,
            )?;
        }
        for (code, entry) in &self.subdivisions {
            entry.validate(&format!("{path}/{code}"))?;
        }
        Ok(())
    }

    /// The rate in force at `as_of`.
    pub fn effective_at(&self, as_of: DateTime<Utc>) -> EffectiveRate {
        let upcoming = self
            .scheduled
            .range((Bound::Excluded(as_of), Bound::Unbounded))
            .next();

        match upcoming {
            Some((_, scheduled)) => EffectiveRate {
                tax_type: scheduled
                    .tax_type
                    .clone()
                    .unwrap_or_else(|| self.tax_type.clone()),
                rate: scheduled.rate,
                currency: self.currency.clone(),
            },
            None => EffectiveRate {
                tax_type: self.tax_type.clone(),
                rate: self.rate,
                currency: self.currency.clone(),
            },
        }
    }
}

/// The type and rate a jurisdiction applies at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRate {
    pub tax_type: String,
    pub rate: Decimal,
    pub currency: Option<String>,
}

impl EffectiveRate {
    /// Zero-rate default for unknown jurisdictions.
    pub fn none() -> Self {
        Self {
            tax_type: TAX_TYPE_NONE.to_string(),
            rate: Decimal::ZERO,
            currency: None,
        }
    }

    pub fn is_taxed(&self) -> bool {
        self.rate > Decimal::ZERO
    }
}

/// Country and subdivision rates resolved together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRates {
    pub country: EffectiveRate,
    pub state: EffectiveRate,
}

impl ResolvedRates {
    pub fn has_any_tax(&self) -> bool {
        self.country.is_taxed() || self.state.is_taxed()
    }
}

/// Immutable store of jurisdiction tax entries.
#[derive(Debug, Clone, Default)]
pub struct RateRepository {
    entries: HashMap<String, JurisdictionTaxEntry>,
}

impl RateRepository {
    /// Repository over the rate table shipped with the crate.
    pub fn bundled() -> Result<Self, SalesTaxError> {
        Self::from_json(BUNDLED_RATES)
    }

    /// Parse a rate table.
    ///
    /// Every scheduled boundary is parsed here: a table with a malformed
    /// instant, a rate outside `[0, 1)` or two codes differing only in case
    /// is rejected as a whole.
    pub fn from_json(json: &str) -> Result<Self, SalesTaxError> {
        let raw: HashMap<String, RawEntry> = serde_json::from_str(json)
            .map_err(|e| SalesTaxError::Config(format!("invalid rate table: {e}")))?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (code, entry) in raw {
            let code = code.to_ascii_uppercase();
            let entry = entry.into_entry(&code)?;
            insert_unique(&mut entries, code, entry, "rate table")?;
        }

        tracing::debug!(jurisdictions = entries.len(), "loaded rate table");
        Ok(Self { entries })
    }

    /// Build a repository from entries constructed in code.
    ///
    /// # Errors
    ///
    /// Returns `SalesTaxError::Config` if any rate (base, scheduled or
    /// subdivision) lies outside `[0, 1)`, or if two codes differ only in case.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, JurisdictionTaxEntry)>,
    ) -> Result<Self, SalesTaxError> {
        let mut map = HashMap::new();
        for (code, entry) in entries {
            let code = code.to_ascii_uppercase();
            entry.validate(&code)?;
            insert_unique(&mut map, code, entry, "rate table")?;
        }
        Ok(Self { entries: map })
    }

    pub fn entry(&self, country_code: &str) -> Option<&JurisdictionTaxEntry> {
        self.entries.get(country_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Country rate at `as_of`; unknown countries are untaxed.
    pub fn country_rate(&self, country_code: &str, as_of: DateTime<Utc>) -> EffectiveRate {
        self.entries
            .get(country_code)
            .map(|e| e.effective_at(as_of))
            .unwrap_or_else(EffectiveRate::none)
    }

    /// Subdivision rate at `as_of`; unknown subdivisions are untaxed.
    pub fn state_rate(
        &self,
        country_code: &str,
        state_code: &str,
        as_of: DateTime<Utc>,
    ) -> EffectiveRate {
        self.entries
            .get(country_code)
            .and_then(|e| e.subdivisions.get(state_code))
            .map(|e| e.effective_at(as_of))
            .unwrap_or_else(EffectiveRate::none)
    }

    /// Resolve the country and (optional) subdivision rates at `as_of`.
    ///
    /// Codes are expected upper-case.
    pub fn resolve(
        &self,
        country_code: &str,
        state_code: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> ResolvedRates {
        let country = self.country_rate(country_code, as_of);
        let state = match state_code {
            Some(state) => self.state_rate(country_code, state, as_of),
            None => EffectiveRate::none(),
        };
        ResolvedRates { country, state }
    }
}

fn parse_boundary(value: &str) -> Result<DateTime<Utc>, SalesTaxError> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| SalesTaxError::Config(format!("invalid scheduled rate date '{value}': {e}")))
}

fn insert_unique(
    map: &mut HashMap<String, JurisdictionTaxEntry>,
    code: String,
    entry: JurisdictionTaxEntry,
    path: &str,
) -> Result<(), SalesTaxError> {
    if map.contains_key(&code) {
        return Err(SalesTaxError::Config(format!(
            "duplicate jurisdiction code '{code}' in {path}"
        )));
    }
    map.insert(code, entry);
    Ok(())
}

fn check_rate(path: &str, rate: Decimal) -> Result<(), SalesTaxError> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(SalesTaxError::Config(format!(
            "rate {rate} for {path} outside [0, 1)"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    tax_type: String,
    rate: Decimal,
    currency: Option<String>,
    #[serde(default)]
    states: HashMap<String, RawEntry>,
    #[serde(default)]
    before: HashMap<String, RawScheduledRate>,
}

#[derive(Debug, Deserialize)]
struct RawScheduledRate {
    #[serde(rename = "type")]
    tax_type: Option<String>,
    rate: Decimal,
}

impl RawEntry {
    fn into_entry(self, path: &str) -> Result<JurisdictionTaxEntry, SalesTaxError> {
        check_rate(path, self.rate)?;

        let mut scheduled = BTreeMap::new();
        for (boundary, raw) in self.before {
            let at = parse_boundary(&boundary).map_err(|e| match e {
                SalesTaxError::Config(msg) => SalesTaxError::Config(format!("{path}: {msg}")),
                other => other,
            })?;
            check_rate(&format!("{path} before {boundary}"), raw.rate)?;
            scheduled.insert(
                at,
                ScheduledRate {
                    tax_type: raw.tax_type,
                    rate: raw.rate,
                },
            );
        }

        let mut subdivisions = HashMap::with_capacity(self.states.len());
        for (code, entry) in self.states {
            let code = code.to_ascii_uppercase();
            let entry = entry.into_entry(&format!("{path}/{code}"))?;
            insert_unique(&mut subdivisions, code, entry, path)?;
        }

        Ok(JurisdictionTaxEntry {
            tax_type: self.tax_type,
            rate: self.rate,
            currency: self.currency,
            subdivisions,
            scheduled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn estonia() -> JurisdictionTaxEntry {
        JurisdictionTaxEntry::new("vat", dec!(0.24))
            .before("2025-07-01T00:00:00Z", None, dec!(0.22))
            .unwrap()
            .before("2024-01-01T00:00:00Z", None, dec!(0.20))
            .unwrap()
    }

    #[test]
    fn base_rate_after_all_boundaries() {
        assert_eq!(estonia().effective_at(at(2026, 1, 1)).rate, dec!(0.24));
    }

    #[test]
    fn boundary_instant_switches_to_next_rate() {
        let entry = estonia();
        let boundary = at(2025, 7, 1);
        assert_eq!(
            entry
                .effective_at(boundary - chrono::Duration::seconds(1))
                .rate,
            dec!(0.22)
        );
        assert_eq!(entry.effective_at(boundary).rate, dec!(0.24));
    }

    #[test]
    fn earliest_upcoming_boundary_wins() {
        // Both boundaries lie ahead; the 2024 one is nearest.
        assert_eq!(estonia().effective_at(at(2023, 6, 1)).rate, dec!(0.20));
        assert_eq!(estonia().effective_at(at(2024, 6, 1)).rate, dec!(0.22));
    }

    #[test]
    fn scheduled_type_overrides_label() {
        let entry = JurisdictionTaxEntry::new("gst", dec!(0.09))
            .before("2020-01-01T00:00:00Z", Some("vat"), dec!(0.07))
            .unwrap();
        let old = entry.effective_at(at(2019, 1, 1));
        assert_eq!(old.tax_type, "vat");
        assert_eq!(entry.effective_at(at(2021, 1, 1)).tax_type, "gst");
    }

    #[test]
    fn malformed_boundary_rejected() {
        let err = JurisdictionTaxEntry::new("vat", dec!(0.2))
            .before("next tuesday", None, dec!(0.1))
            .unwrap_err();
        assert!(matches!(err, SalesTaxError::Config(_)));
    }

    #[test]
    fn table_with_malformed_boundary_rejected() {
        let json = r#"{"XX":{"type":"vat","rate":0.1,"before":{"2020-13-45":{"rate":0.05}}}}"#;
        let err = RateRepository::from_json(json).unwrap_err();
        assert!(err.to_string().contains("XX"));
    }

    #[test]
    fn nested_malformed_boundary_rejected() {
        let json = r#"{"XX":{"type":"vat","rate":0.1,"states":{"AA":{"type":"pst","rate":0.05,"before":{"bad":{"rate":0.01}}}}}}"#;
        let err = RateRepository::from_json(json).unwrap_err();
        assert!(err.to_string().contains("XX/AA"));
    }

    #[test]
    fn rate_out_of_range_rejected() {
        let json = r#"{"XX":{"type":"vat","rate":1.5}}"#;
        assert!(RateRepository::from_json(json).is_err());
    }

    #[test]
    fn scheduled_rate_out_of_range_rejected() {
        let err = JurisdictionTaxEntry::new("vat", dec!(0.2))
            .before("2020-01-01T00:00:00Z", None, dec!(1))
            .unwrap_err();
        assert!(err.to_string().contains("outside [0, 1)"));
    }

    #[test]
    fn entries_validated_recursively() {
        let nested = JurisdictionTaxEntry::new("gst", dec!(0.05))
            .subdivision("qc", JurisdictionTaxEntry::new("qst", dec!(-0.1)));
        let err = RateRepository::from_entries([("xx".to_string(), nested)]).unwrap_err();
        assert!(err.to_string().contains("XX/QC"));
    }

    #[test]
    fn duplicate_codes_differing_in_case_rejected() {
        let json = r#"{"fr":{"type":"vat","rate":0.2},"FR":{"type":"vat","rate":0.1}}"#;
        let err = RateRepository::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate jurisdiction code 'FR'"));
    }

    #[test]
    fn unknown_jurisdictions_untaxed() {
        let repo = RateRepository::bundled().unwrap();
        let resolved = repo.resolve("DONT_EXIST", Some("XX"), at(2026, 1, 1));
        assert_eq!(resolved.country, EffectiveRate::none());
        assert_eq!(resolved.state, EffectiveRate::none());
        assert!(!resolved.has_any_tax());
    }

    #[test]
    fn unknown_state_of_known_country_untaxed() {
        let repo = RateRepository::bundled().unwrap();
        let resolved = repo.resolve("CA", Some("DONT_EXIST"), at(2026, 1, 1));
        assert_eq!(resolved.country.rate, dec!(0.05));
        assert_eq!(resolved.state.tax_type, "none");
    }

    #[test]
    fn codes_normalized_on_load() {
        let repo = RateRepository::from_json(
            r#"{"fr":{"type":"vat","rate":0.2,"states":{"qc":{"type":"qst","rate":0.1}}}}"#,
        )
        .unwrap();
        assert!(repo.entry("FR").is_some());
        assert_eq!(repo.state_rate("FR", "QC", at(2026, 1, 1)).rate, dec!(0.1));
    }

    #[test]
    fn bundled_table_loads() {
        let repo = RateRepository::bundled().unwrap();
        assert!(repo.len() > 100);
        assert_eq!(repo.country_rate("FR", at(2026, 1, 1)).rate, dec!(0.20));
    }
}
