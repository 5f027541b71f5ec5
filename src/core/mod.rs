//! Core tax model: rate tables, regions, configuration and context building.
//!
//! Everything here is synchronous and free of I/O. The asynchronous,
//! possibly networked part lives in [`crate::taxid`].

mod clock;
pub mod config;
mod context;
mod error;
pub mod rates;
mod regions;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, Settings};
pub use context::build_tax_context;
pub use error::*;
pub use rates::{EffectiveRate, JurisdictionTaxEntry, RateRepository, ResolvedRates, ScheduledRate};
pub use regions::EconomicRegions;
pub use types::*;
