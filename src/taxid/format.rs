//! Offline tax-number format validation.

use crate::core::TaxNumberFormatError;

/// A tax number split into its country prefix and local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxNumberParts {
    /// Embedded country prefix (e.g. "FR", "EL"), if the scheme has one.
    pub prefix: Option<String>,
    /// The number without its prefix.
    pub local: String,
}

impl TaxNumberParts {
    pub fn unprefixed(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }
}

/// Format and check-digit validation for one tax-number scheme.
pub trait FormatValidator: Send + Sync {
    /// Validate `number` (whitespace already stripped) as issued by
    /// `country_code` (upper-case).
    fn validate(
        &self,
        country_code: &str,
        number: &str,
    ) -> Result<TaxNumberParts, TaxNumberFormatError>;
}

/// Fixed-length all-digit identifiers (e.g. the Canadian business number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitPattern {
    pub len: usize,
}

impl DigitPattern {
    pub const fn new(len: usize) -> Self {
        Self { len }
    }
}

impl FormatValidator for DigitPattern {
    fn validate(
        &self,
        _country_code: &str,
        number: &str,
    ) -> Result<TaxNumberParts, TaxNumberFormatError> {
        if number.len() == self.len && all_digits(number) {
            Ok(TaxNumberParts::unprefixed(number))
        } else {
            Err(TaxNumberFormatError::new(
                number,
                format!("expected {} digits", self.len),
            ))
        }
    }
}

pub(crate) fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Numeric value of the ASCII digit at byte `i`. Caller checks `all_digits`.
pub(crate) fn digit(s: &str, i: usize) -> u32 {
    u32::from(s.as_bytes()[i] - b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_pattern_accepts_exact_length() {
        let parts = DigitPattern::new(9).validate("CA", "123456789").unwrap();
        assert_eq!(parts, TaxNumberParts::unprefixed("123456789"));
    }

    #[test]
    fn digit_pattern_rejects_letters_and_lengths() {
        let p = DigitPattern::new(9);
        assert!(p.validate("CA", "12345678").is_err());
        assert!(p.validate("CA", "1234567890").is_err());
        assert!(p.validate("CA", "12345678A").is_err());
        assert!(p.validate("CA", "INVALID_TAX_NUMBER").is_err());
    }
}
