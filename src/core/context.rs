//! Composition of country and subdivision rates into a [`TaxContext`].

use rust_decimal::Decimal;

use super::rates::ResolvedRates;
use super::types::{ExchangeStatus, TAX_TYPE_NONE, TaxCharge, TaxContext, TaxDetail};

/// Build the tax context for resolved rates under an exchange status.
///
/// # Rules
///
/// 1. `type` joins the labels of the taxed levels with `+`, or is "none"
/// 2. Exempt → rate 0 and no details; otherwise rate = sum of details
/// 3. `charge.direct` when taxed and not exempt
/// 4. `charge.reverse` when taxed, exempt and the raw rate is non-zero
pub fn build_tax_context(rates: &ResolvedRates, status: ExchangeStatus) -> TaxContext {
    let ResolvedRates { country, state } = rates;

    let details: Vec<TaxDetail> = [country, state]
        .into_iter()
        .filter(|r| r.is_taxed())
        .map(|r| TaxDetail {
            tax_type: r.tax_type.clone(),
            rate: r.rate,
        })
        .collect();

    let full_rate: Decimal = details.iter().map(|d| d.rate).sum();

    let tax_type = if details.is_empty() {
        TAX_TYPE_NONE.to_string()
    } else {
        details
            .iter()
            .map(|d| d.tax_type.as_str())
            .collect::<Vec<_>>()
            .join("+")
    };

    let taxed = tax_type != TAX_TYPE_NONE;
    let charge = TaxCharge {
        direct: taxed && !status.exempt,
        reverse: taxed && status.exempt && full_rate > Decimal::ZERO,
    };

    let (rate, details) = if status.exempt {
        (Decimal::ZERO, Vec::new())
    } else {
        (full_rate, details)
    };

    TaxContext {
        tax_type,
        rate,
        area: status.area,
        exchange: status.exchange,
        exempt: status.exempt,
        charge,
        details,
        currency: country.currency.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::EffectiveRate;
    use crate::core::types::{TaxArea, TaxExchange};
    use rust_decimal_macros::dec;

    fn rate(t: &str, r: Decimal) -> EffectiveRate {
        EffectiveRate {
            tax_type: t.into(),
            rate: r,
            currency: None,
        }
    }

    fn gst_qst() -> ResolvedRates {
        ResolvedRates {
            country: rate("gst", dec!(0.05)),
            state: rate("qst", dec!(0.09975)),
        }
    }

    #[test]
    fn composite_type_and_rate() {
        let ctx = build_tax_context(&gst_qst(), ExchangeStatus::consumer(TaxArea::Worldwide));
        assert_eq!(ctx.tax_type, "gst+qst");
        assert_eq!(ctx.rate, dec!(0.14975));
        assert_eq!(ctx.details.len(), 2);
        assert_eq!(ctx.details[0].tax_type, "gst");
        assert_eq!(ctx.details[1].tax_type, "qst");
        assert!(ctx.charge.direct);
        assert!(!ctx.charge.reverse);
    }

    #[test]
    fn state_only_uses_state_label() {
        let rates = ResolvedRates {
            country: rate("none", dec!(0)),
            state: rate("vat", dec!(0.0725)),
        };
        let ctx = build_tax_context(&rates, ExchangeStatus::consumer(TaxArea::Worldwide));
        assert_eq!(ctx.tax_type, "vat");
        assert_eq!(ctx.rate, dec!(0.0725));
        assert_eq!(ctx.details.len(), 1);
    }

    #[test]
    fn zero_rates_are_none_even_with_a_label() {
        let rates = ResolvedRates {
            country: rate("vat", dec!(0)),
            state: rate("pst", dec!(0)),
        };
        let ctx = build_tax_context(&rates, ExchangeStatus::untaxed(TaxArea::Worldwide));
        assert_eq!(ctx.tax_type, "none");
        assert!(!ctx.charge.direct);
        assert!(!ctx.charge.reverse);
    }

    #[test]
    fn exempt_forces_zero_and_reverse_charge() {
        let ctx = build_tax_context(&gst_qst(), ExchangeStatus::business(TaxArea::Regional));
        assert_eq!(ctx.tax_type, "gst+qst");
        assert_eq!(ctx.rate, dec!(0));
        assert!(ctx.details.is_empty());
        assert!(ctx.exempt);
        assert_eq!(ctx.exchange, TaxExchange::Business);
        assert!(!ctx.charge.direct);
        assert!(ctx.charge.reverse);
    }

    #[test]
    fn national_business_pays_direct() {
        let ctx = build_tax_context(&gst_qst(), ExchangeStatus::business(TaxArea::National));
        assert_eq!(ctx.rate, dec!(0.14975));
        assert!(ctx.charge.direct);
        assert!(!ctx.charge.reverse);
    }

    #[test]
    fn currency_from_country() {
        let mut rates = gst_qst();
        rates.country.currency = Some("CAD".into());
        let ctx = build_tax_context(&rates, ExchangeStatus::default());
        assert_eq!(ctx.currency.as_deref(), Some("CAD"));
    }
}
