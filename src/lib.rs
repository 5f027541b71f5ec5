//! # salestax
//!
//! Sales tax resolution for international sales: given the buyer's country,
//! optional state or province and optional tax-identification number, decide
//! which tax applies, at which rate, and whether the sale is exempt under the
//! reverse-charge mechanism.
//!
//! All rates and amounts use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_decimal_macros::dec;
//! use salestax::SalesTax;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! # rt.block_on(async {
//! let engine = SalesTax::new().unwrap();
//!
//! let tax = engine.get_sales_tax("CA", Some("QC"), None).await.unwrap();
//! assert_eq!(tax.tax_type, "gst+qst");
//! assert_eq!(tax.rate, dec!(0.14975));
//!
//! // A French seller billing a German business: reverse charge.
//! engine.set_tax_origin_country(Some("FR"), true);
//! let tax = engine.get_sales_tax("DE", None, Some("DE123456788")).await.unwrap();
//! assert!(tax.exempt && tax.charge.reverse);
//! # });
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | *(default)* | Rate tables, trade areas, offline tax-number formats |
//! | `vies` | Fraud checks against the EU VIES registry |
//! | `hmrc` | Fraud checks against the HMRC VAT registry |
//! | `all` | Everything |

pub mod core;
pub mod engine;
pub mod taxid;

// Re-export core types at crate root for convenience
pub use crate::core::*;
pub use crate::engine::{SalesTax, SalesTaxBuilder};
