//! US Employer Identification Number (EIN) validation.

use super::format::{FormatValidator, TaxNumberParts, all_digits};
use crate::core::TaxNumberFormatError;

/// Two-digit prefixes the IRS assigns to its campuses.
/// Sorted for binary search.
static EIN_PREFIXES: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "10", "11", "12", "13", "14", "15", "16", "20", "21", "22",
    "23", "24", "25", "26", "27", "30", "31", "32", "33", "34", "35", "36", "37", "38", "39", "40",
    "41", "42", "43", "44", "45", "46", "47", "48", "50", "51", "52", "53", "54", "55", "56", "57",
    "58", "59", "60", "61", "62", "63", "64", "65", "66", "67", "68", "71", "72", "73", "74", "75",
    "76", "77", "80", "81", "82", "83", "84", "85", "86", "87", "88", "90", "91", "92", "93", "94",
    "95", "98", "99",
];

/// EIN in `NN-NNNNNNN` or plain 9-digit form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EinValidator;

impl FormatValidator for EinValidator {
    fn validate(
        &self,
        _country_code: &str,
        number: &str,
    ) -> Result<TaxNumberParts, TaxNumberFormatError> {
        let digits = match number.split_once('-') {
            Some((prefix, serial)) if prefix.len() == 2 && serial.len() == 7 => {
                format!("{prefix}{serial}")
            }
            Some(_) => {
                return Err(TaxNumberFormatError::new(
                    number,
                    "hyphen must follow the two-digit prefix",
                ));
            }
            None => number.to_string(),
        };

        if digits.len() != 9 || !all_digits(&digits) {
            return Err(TaxNumberFormatError::new(number, "expected 9 digits"));
        }

        if EIN_PREFIXES.binary_search(&&digits[..2]).is_err() {
            return Err(TaxNumberFormatError::new(
                number,
                format!("unassigned EIN prefix '{}'", &digits[..2]),
            ));
        }

        Ok(TaxNumberParts::unprefixed(digits))
    }
}
