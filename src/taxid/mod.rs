//! Tax-identification number validation.
//!
//! Numbers are cleaned of whitespace, then dispatched by jurisdiction
//! through a [`ValidatorRegistry`] to an offline [`FormatValidator`]
//! (EIN, business number, EU/UK VAT number with check digits). When fraud
//! checks are enabled, format-valid numbers are confirmed online through a
//! [`RegistryLookup`] (VIES, HMRC).
//!
//! # Example
//!
//! ```ignore
//! use salestax::taxid::*;
//!
//! // Format-only validation (no network)
//! assert!(validate_vat_number("FR87524172699").is_ok());
//!
//! // VIES API check (async, requires network and the `vies` feature)
//! let vies = ViesClient::new(std::time::Duration::from_secs(20))?;
//! assert!(vies.check("FR", "87524172699").await?.valid);
//! ```

mod ein;
mod eu_vat;
mod format;
#[cfg(feature = "hmrc")]
mod hmrc;
mod lookup;
mod registry;
#[cfg(feature = "vies")]
mod vies;

pub use ein::EinValidator;
pub use eu_vat::{VatNumberValidator, validate_vat_number};
pub use format::{DigitPattern, FormatValidator, TaxNumberParts};
#[cfg(feature = "hmrc")]
pub use hmrc::{HMRC_URL, HmrcClient, HmrcTarget};
pub use lookup::RegistryLookup;
pub use registry::{TaxNumberRule, ValidatorRegistry};
#[cfg(feature = "vies")]
pub use vies::{VIES_URL, ViesClient, ViesResult};

/// Strip all whitespace; `None` when nothing remains.
pub fn clean_tax_number(raw: Option<&str>) -> Option<String> {
    let cleaned: String = raw?.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_all_whitespace() {
        assert_eq!(
            clean_tax_number(Some(" FR 87 524\t172\n699 ")).as_deref(),
            Some("FR87524172699")
        );
    }

    #[test]
    fn blank_is_none() {
        assert_eq!(clean_tax_number(Some(" \t ")), None);
        assert_eq!(clean_tax_number(Some("")), None);
        assert_eq!(clean_tax_number(None), None);
    }
}
