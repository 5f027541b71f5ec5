//! EU and UK VAT number validation: prefix, format and check digits.

use super::format::{FormatValidator, TaxNumberParts, all_digits, digit};
use crate::core::TaxNumberFormatError;

type CheckDigits = fn(&str) -> bool;

/// Validate a VAT number by format and, where published, check digits.
///
/// The input must include the 2-letter prefix (e.g. "FR87524172699") and
/// contain no whitespace. Lower-case input is accepted.
pub fn validate_vat_number(vat_id: &str) -> Result<TaxNumberParts, TaxNumberFormatError> {
    let vat_id = vat_id.to_ascii_uppercase();
    if !vat_id.is_ascii() {
        return Err(TaxNumberFormatError::new(vat_id, "contains non-ASCII characters"));
    }
    if vat_id.len() < 4 {
        return Err(TaxNumberFormatError::new(
            vat_id,
            "too short, must be at least 4 characters",
        ));
    }

    let (prefix, number) = vat_id.split_at(2);

    let Some((format_ok, check)) = rule(prefix, number) else {
        return Err(TaxNumberFormatError::new(
            vat_id.as_str(),
            format!("unknown VAT prefix '{prefix}'"),
        ));
    };

    if !format_ok {
        return Err(TaxNumberFormatError::new(
            vat_id.as_str(),
            format!("invalid format for prefix {prefix}"),
        ));
    }

    if let Some(check) = check {
        if !check(number) {
            return Err(TaxNumberFormatError::new(
                vat_id.as_str(),
                "check digits do not match",
            ));
        }
    }

    Ok(TaxNumberParts {
        prefix: Some(prefix.to_string()),
        local: number.to_string(),
    })
}

/// Format verdict and check-digit routine for a prefix, `None` if unknown.
fn rule(prefix: &str, n: &str) -> Option<(bool, Option<CheckDigits>)> {
    let digits = all_digits(n);
    let len = n.len();

    let rule: (bool, Option<CheckDigits>) = match prefix {
        "AT" => (
            len == 9 && n.starts_with('U') && all_digits(&n[1..]),
            Some(at_check),
        ),
        "BE" => (
            len == 10 && digits && matches!(&n[..1], "0" | "1"),
            Some(be_check),
        ),
        "BG" => ((len == 9 || len == 10) && digits, None),
        "CY" => (
            len == 9 && all_digits(&n[..8]) && n.as_bytes()[8].is_ascii_alphabetic(),
            None,
        ),
        "CZ" => ((8..=10).contains(&len) && digits, None),
        "DE" => (len == 9 && digits && !n.starts_with('0'), Some(de_check)),
        "DK" => (len == 8 && digits && !n.starts_with('0'), Some(dk_check)),
        "EE" => (len == 9 && digits, Some(ee_check)),
        "EL" => (len == 9 && digits, Some(el_check)),
        "ES" => (len == 9 && n.bytes().all(|b| b.is_ascii_alphanumeric()), None),
        "FI" => (len == 8 && digits, Some(fi_check)),
        "FR" => (
            len == 11
                && n[..2].bytes().all(|b| b.is_ascii_alphanumeric())
                && all_digits(&n[2..]),
            Some(fr_check),
        ),
        "GB" => (gb_format(n), Some(gb_check)),
        "HR" => (len == 11 && digits, Some(hr_check)),
        "HU" => (len == 8 && digits, Some(hu_check)),
        "IE" => (
            (len == 8 || len == 9) && n.bytes().all(|b| b.is_ascii_alphanumeric()),
            None,
        ),
        "IT" => (len == 11 && digits, Some(it_check)),
        "LT" => ((len == 9 || len == 12) && digits, None),
        "LU" => (len == 8 && digits, Some(lu_check)),
        "LV" => (len == 11 && digits, None),
        "MT" => (len == 8 && digits, None),
        "NL" => (
            len == 12 && all_digits(&n[..9]) && &n[9..10] == "B" && all_digits(&n[10..]),
            Some(nl_check),
        ),
        "PL" => (len == 10 && digits, Some(pl_check)),
        "PT" => (len == 9 && digits, Some(pt_check)),
        "RO" => ((2..=10).contains(&len) && digits, None),
        "SE" => (len == 12 && digits && n.ends_with("01"), Some(se_check)),
        "SI" => (len == 8 && digits && !n.starts_with('0'), None),
        "SK" => (len == 10 && digits, None),
        _ => return None,
    };
    Some(rule)
}

fn weighted_sum(n: &str, weights: &[u32]) -> u32 {
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| digit(n, i) * w)
        .sum()
}

/// ISO 7064 MOD 11,10 over all but the last digit.
fn mod11_10(n: &str) -> bool {
    let last = n.len() - 1;
    let mut product = 10;
    for i in 0..last {
        let mut sum = (digit(n, i) + product) % 10;
        if sum == 0 {
            sum = 10;
        }
        product = (2 * sum) % 11;
    }
    let check = (11 - product) % 10;
    check == digit(n, last)
}

/// Luhn over every digit of `n`.
fn luhn(n: &str) -> bool {
    let sum: u32 = n
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let d = d * 2;
                if d > 9 { d - 9 } else { d }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Remainder of a base-36 alphanumeric string interpreted digit-wise mod 97.
fn alnum_mod97(s: &str) -> Option<u32> {
    let mut rem = 0u32;
    for c in s.chars() {
        let v = c.to_digit(36)?;
        rem = if v >= 10 {
            (rem * 100 + v) % 97
        } else {
            (rem * 10 + v) % 97
        };
    }
    Some(rem)
}

fn at_check(n: &str) -> bool {
    let n = &n[1..];
    let sum: u32 = (0..7)
        .map(|i| {
            let p = digit(n, i) * if i % 2 == 1 { 2 } else { 1 };
            p / 10 + p % 10
        })
        .sum();
    (10 - (sum + 4) % 10) % 10 == digit(n, 7)
}

fn be_check(n: &str) -> bool {
    let body: u64 = n[..8].parse().unwrap_or(0);
    let check: u64 = n[8..].parse().unwrap_or(0);
    97 - body % 97 == check
}

fn de_check(n: &str) -> bool {
    mod11_10(n)
}

fn dk_check(n: &str) -> bool {
    weighted_sum(n, &[2, 7, 6, 5, 4, 3, 2, 1]) % 11 == 0
}

fn ee_check(n: &str) -> bool {
    let sum = weighted_sum(n, &[3, 7, 1, 3, 7, 1, 3, 7]);
    (10 - sum % 10) % 10 == digit(n, 8)
}

fn el_check(n: &str) -> bool {
    let sum: u32 = (0..8).map(|i| digit(n, i) << (8 - i)).sum();
    sum % 11 % 10 == digit(n, 8)
}

fn fi_check(n: &str) -> bool {
    let check = 11 - weighted_sum(n, &[7, 9, 10, 5, 8, 4, 2]) % 11;
    match check {
        10 => false,
        11 => digit(n, 7) == 0,
        c => c == digit(n, 7),
    }
}

/// Numeric keys are derived from the SIREN; alphabetic keys have no
/// published algorithm and pass on format alone.
fn fr_check(n: &str) -> bool {
    let (key, siren) = n.split_at(2);
    if !all_digits(key) {
        return true;
    }
    let siren: u64 = siren.parse().unwrap_or(0);
    let key: u64 = key.parse().unwrap_or(u64::MAX);
    (12 + 3 * (siren % 97)) % 97 == key
}

fn gb_format(n: &str) -> bool {
    match n.len() {
        9 | 12 => all_digits(n),
        // Government departments (GD) and health authorities (HA).
        5 => matches!(&n[..2], "GD" | "HA") && all_digits(&n[2..]),
        _ => false,
    }
}

fn gb_check(n: &str) -> bool {
    if n.len() == 5 {
        return true;
    }
    let sum = weighted_sum(n, &[8, 7, 6, 5, 4, 3, 2]);
    let check: u32 = n[7..9].parse().unwrap_or(u32::MAX);
    (sum + check) % 97 == 0 || (sum + check + 55) % 97 == 0
}

fn hr_check(n: &str) -> bool {
    mod11_10(n)
}

fn hu_check(n: &str) -> bool {
    let sum = weighted_sum(n, &[9, 7, 3, 1, 9, 7, 3]);
    (10 - sum % 10) % 10 == digit(n, 7)
}

fn it_check(n: &str) -> bool {
    n[..7] != *"0000000" && luhn(n)
}

fn lu_check(n: &str) -> bool {
    let body: u32 = n[..6].parse().unwrap_or(0);
    let check: u32 = n[6..].parse().unwrap_or(u32::MAX);
    body % 89 == check
}

/// Legal entities use MOD 11 on the first nine digits; sole proprietors
/// (since 2020) use MOD 97 over the whole identifier.
fn nl_check(n: &str) -> bool {
    let sum = weighted_sum(n, &[9, 8, 7, 6, 5, 4, 3, 2]);
    let mod11 = sum % 11 == digit(n, 8);
    mod11 || alnum_mod97(&format!("NL{n}")) == Some(1)
}

fn pl_check(n: &str) -> bool {
    let sum = weighted_sum(n, &[6, 5, 7, 2, 3, 4, 5, 6, 7]) % 11;
    sum != 10 && sum == digit(n, 9)
}

fn pt_check(n: &str) -> bool {
    let check = 11 - weighted_sum(n, &[9, 8, 7, 6, 5, 4, 3, 2]) % 11;
    let check = if check > 9 { 0 } else { check };
    check == digit(n, 8)
}

fn se_check(n: &str) -> bool {
    luhn(&n[..10])
}

/// VAT number validator for the jurisdictions whose numbers carry one of
/// `prefixes` (e.g. Greece issues "EL", Monaco issues French numbers).
#[derive(Debug, Clone, Copy)]
pub struct VatNumberValidator {
    prefixes: &'static [&'static str],
}

impl VatNumberValidator {
    pub const fn accepting(prefixes: &'static [&'static str]) -> Self {
        Self { prefixes }
    }

    /// Accepts numbers whose prefix equals the queried country code.
    pub const fn own_prefix() -> Self {
        Self { prefixes: &[] }
    }
}

impl FormatValidator for VatNumberValidator {
    fn validate(
        &self,
        country_code: &str,
        number: &str,
    ) -> Result<TaxNumberParts, TaxNumberFormatError> {
        let parts = validate_vat_number(number)?;
        let prefix = parts.prefix.as_deref().unwrap_or_default();

        let matches = if self.prefixes.is_empty() {
            prefix == country_code
        } else {
            self.prefixes.contains(&prefix)
        };

        if !matches {
            return Err(TaxNumberFormatError::new(
                number,
                format!("prefix {prefix} does not belong to {country_code}"),
            ));
        }
        Ok(parts)
    }
}
