use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::SalesTaxError;

/// Tax type label used when no tax applies.
pub const TAX_TYPE_NONE: &str = "none";

/// Trade relationship between the configured origin and the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxArea {
    /// No origin configured, or origin and destination share no region.
    Worldwide,
    /// Origin and destination are the same country.
    National,
    /// Origin and destination belong to a common economic region.
    Regional,
}

impl TaxArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worldwide => "worldwide",
            Self::National => "national",
            Self::Regional => "regional",
        }
    }
}

/// Whether the buyer is treated as a registered business or a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxExchange {
    /// B2B: a valid tax number was supplied.
    Business,
    /// B2C, or a business without a valid tax number.
    Consumer,
}

impl TaxExchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Consumer => "consumer",
        }
    }
}

/// Exchange classification and exemption decision for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStatus {
    pub exchange: TaxExchange,
    pub area: TaxArea,
    /// The computed rate is forced to zero.
    pub exempt: bool,
}

impl ExchangeStatus {
    /// Status of a destination without any tax: trivially exempt.
    pub fn untaxed(area: TaxArea) -> Self {
        Self {
            exchange: TaxExchange::Consumer,
            area,
            exempt: true,
        }
    }

    /// Status of a taxed consumer sale.
    pub fn consumer(area: TaxArea) -> Self {
        Self {
            exchange: TaxExchange::Consumer,
            area,
            exempt: false,
        }
    }

    /// Status of a sale to a business with a validated tax number.
    ///
    /// Reverse charge only crosses borders: national B2B is still taxed.
    pub fn business(area: TaxArea) -> Self {
        Self {
            exchange: TaxExchange::Business,
            area,
            exempt: area != TaxArea::National,
        }
    }
}

impl Default for ExchangeStatus {
    fn default() -> Self {
        Self::consumer(TaxArea::Worldwide)
    }
}

/// Who accounts for the tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCharge {
    /// The seller charges the tax.
    pub direct: bool,
    /// The buyer self-assesses the tax (reverse charge).
    pub reverse: bool,
}

/// One applicable sub-tax (e.g. the GST part of GST+QST).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDetail {
    #[serde(rename = "type")]
    pub tax_type: String,
    pub rate: Decimal,
}

/// Resolved tax decision for one (origin, destination, tax number) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxContext {
    /// Applicable sub-tax labels joined with `+` (e.g. "gst+qst"), or "none".
    #[serde(rename = "type")]
    pub tax_type: String,
    /// Effective rate: sum of `details`, zero when exempt.
    pub rate: Decimal,
    pub area: TaxArea,
    pub exchange: TaxExchange,
    pub exempt: bool,
    pub charge: TaxCharge,
    /// Applicable sub-taxes, country first. Empty when exempt.
    pub details: Vec<TaxDetail>,
    /// ISO 4217 currency of the taxing jurisdiction, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl TaxContext {
    /// Apply this context to a net price.
    ///
    /// # Errors
    ///
    /// Returns `SalesTaxError::Overflow` if the taxed total or a sub-tax
    /// amount exceeds the `Decimal` range.
    pub fn with_amount(self, price: Decimal) -> Result<TaxAmount, SalesTaxError> {
        let overflow = || SalesTaxError::Overflow(format!("{price} taxed at {}", self.rate));
        let total = Decimal::ONE
            .checked_add(self.rate)
            .and_then(|factor| price.checked_mul(factor))
            .ok_or_else(overflow)?;
        let details = self
            .details
            .into_iter()
            .map(|d| {
                let amount = price.checked_mul(d.rate).ok_or_else(overflow)?;
                Ok(TaxAmountDetail {
                    amount,
                    tax_type: d.tax_type,
                    rate: d.rate,
                })
            })
            .collect::<Result<Vec<_>, SalesTaxError>>()?;

        Ok(TaxAmount {
            tax_type: self.tax_type,
            rate: self.rate,
            price,
            total,
            area: self.area,
            exchange: self.exchange,
            exempt: self.exempt,
            charge: self.charge,
            details,
            currency: self.currency,
        })
    }
}

/// A sub-tax applied to a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAmountDetail {
    #[serde(rename = "type")]
    pub tax_type: String,
    pub rate: Decimal,
    /// `price * rate`
    pub amount: Decimal,
}

/// A [`TaxContext`] applied to a net price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAmount {
    #[serde(rename = "type")]
    pub tax_type: String,
    pub rate: Decimal,
    /// Net price.
    pub price: Decimal,
    /// `price * (1 + rate)`
    pub total: Decimal,
    pub area: TaxArea,
    pub exchange: TaxExchange,
    pub exempt: bool,
    pub charge: TaxCharge,
    pub details: Vec<TaxAmountDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn business_is_exempt_only_across_borders() {
        assert!(!ExchangeStatus::business(TaxArea::National).exempt);
        assert!(ExchangeStatus::business(TaxArea::Regional).exempt);
        assert!(ExchangeStatus::business(TaxArea::Worldwide).exempt);
    }

    #[test]
    fn enums_serialize_lowercase() {
        let json = serde_json::to_string(&ExchangeStatus::business(TaxArea::Regional)).unwrap();
        assert_eq!(
            json,
            r#"{"exchange":"business","area":"regional","exempt":true}"#
        );
    }

    fn quebec() -> TaxContext {
        TaxContext {
            tax_type: "gst+qst".into(),
            rate: dec!(0.14975),
            area: TaxArea::Worldwide,
            exchange: TaxExchange::Consumer,
            exempt: false,
            charge: TaxCharge {
                direct: true,
                reverse: false,
            },
            details: vec![
                TaxDetail {
                    tax_type: "gst".into(),
                    rate: dec!(0.05),
                },
                TaxDetail {
                    tax_type: "qst".into(),
                    rate: dec!(0.09975),
                },
            ],
            currency: Some("CAD".into()),
        }
    }

    #[test]
    fn with_amount_splits_details() {
        let amount = quebec().with_amount(dec!(100)).unwrap();
        assert_eq!(amount.total, dec!(114.975));
        assert_eq!(amount.details[0].amount, dec!(5));
        assert_eq!(amount.details[1].amount, dec!(9.975));
        let sum: Decimal = amount.details.iter().map(|d| d.amount).sum();
        assert_eq!(amount.price + sum, amount.total);
    }

    #[test]
    fn with_amount_overflow_is_an_error() {
        let err = quebec().with_amount(Decimal::MAX).unwrap_err();
        assert!(matches!(err, SalesTaxError::Overflow(_)));
    }
}
