//! Economic regions and trade-area classification.

use std::collections::{BTreeMap, BTreeSet};

use super::error::SalesTaxError;
use super::types::TaxArea;

const BUNDLED_REGIONS: &str = include_str!("../../res/region_countries.json");

/// Named sets of countries sharing a tax union (EU VAT area, GCC, ...).
///
/// A country may belong to zero or more regions.
#[derive(Debug, Clone, Default)]
pub struct EconomicRegions {
    regions: BTreeMap<String, BTreeSet<String>>,
}

impl EconomicRegions {
    /// Regions shipped with the crate.
    pub fn bundled() -> Result<Self, SalesTaxError> {
        Self::from_json(BUNDLED_REGIONS)
    }

    /// Parse a `{ "REGION": ["CC", ...] }` table.
    pub fn from_json(json: &str) -> Result<Self, SalesTaxError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| SalesTaxError::Config(format!("invalid region table: {e}")))?;
        Ok(Self::from_regions(raw))
    }

    pub fn from_regions<I, C>(regions: impl IntoIterator<Item = (String, I)>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let regions = regions
            .into_iter()
            .map(|(name, members)| {
                let members = members
                    .into_iter()
                    .map(|c| c.as_ref().to_ascii_uppercase())
                    .collect();
                (name, members)
            })
            .collect();
        Self { regions }
    }

    /// Names of the regions `country_code` belongs to.
    pub fn regions_of<'a>(&'a self, country_code: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.regions
            .iter()
            .filter(move |(_, members)| members.contains(country_code))
            .map(|(name, _)| name.as_str())
    }

    /// Whether both countries belong to at least one common region.
    pub fn share_region(&self, a: &str, b: &str) -> bool {
        self.regions
            .values()
            .any(|members| members.contains(a) && members.contains(b))
    }

    /// Classify the trade relationship between `origin` and `destination`.
    ///
    /// Which region is shared does not matter, only that one is.
    pub fn classify(&self, origin: Option<&str>, destination: &str) -> TaxArea {
        match origin {
            None => TaxArea::Worldwide,
            Some(origin) if origin == destination => TaxArea::National,
            Some(origin) if self.share_region(origin, destination) => TaxArea::Regional,
            Some(_) => TaxArea::Worldwide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> EconomicRegions {
        EconomicRegions::from_regions([
            ("EU".to_string(), vec!["FR", "ES", "DE"]),
            ("ALPS".to_string(), vec!["DE", "AT", "CH"]),
            ("IBERIA".to_string(), vec!["ES", "PT", "FR"]),
        ])
    }

    #[test]
    fn no_origin_is_worldwide() {
        assert_eq!(regions().classify(None, "FR"), TaxArea::Worldwide);
    }

    #[test]
    fn same_country_is_national() {
        assert_eq!(regions().classify(Some("FR"), "FR"), TaxArea::National);
    }

    #[test]
    fn shared_region_is_regional() {
        assert_eq!(regions().classify(Some("DE"), "CH"), TaxArea::Regional);
    }

    #[test]
    fn multiple_shared_regions_still_regional() {
        // FR and ES share both EU and IBERIA.
        assert_eq!(regions().classify(Some("ES"), "FR"), TaxArea::Regional);
    }

    #[test]
    fn no_shared_region_is_worldwide() {
        assert_eq!(regions().classify(Some("PT"), "CH"), TaxArea::Worldwide);
        assert_eq!(regions().classify(Some("FR"), "US"), TaxArea::Worldwide);
    }

    #[test]
    fn regions_of_lists_memberships() {
        let r = regions();
        let names: Vec<_> = r.regions_of("FR").collect();
        assert_eq!(names, vec!["EU", "IBERIA"]);
    }

    #[test]
    fn bundled_regions() {
        let r = EconomicRegions::bundled().unwrap();
        assert!(r.share_region("ES", "FR"));
        assert!(r.share_region("FR", "MC"));
        assert!(r.share_region("GB", "IM"));
        assert!(!r.share_region("GB", "FR"));
    }

    #[test]
    fn malformed_table_rejected() {
        assert!(EconomicRegions::from_json(r#"{"EU": "FR"}"#).is_err());
    }
}
