//! The [`SalesTax`] engine: one instance per seller configuration.
//!
//! Rate tables and regions are immutable once built. The only mutable state
//! is the [`Settings`] cell (origin country and toggles), read as a single
//! snapshot at the start of every operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::core::{
    Clock, EconomicRegions, EffectiveRate, EngineConfig, ExchangeStatus, RateRepository,
    ResolvedRates, SalesTaxError, Settings, SystemClock, TaxAmount, TaxArea, TaxContext,
    build_tax_context,
};
use crate::taxid::{ValidatorRegistry, clean_tax_number};

/// Sales tax resolution engine.
///
/// ```
/// use salestax::SalesTax;
///
/// let engine = SalesTax::new().unwrap();
/// assert!(engine.has_sales_tax("fr"));
/// assert!(!engine.has_sales_tax("HK"));
/// assert!(engine.has_state_sales_tax("CA", "QC"));
/// ```
#[derive(Debug)]
pub struct SalesTax {
    rates: RateRepository,
    regions: EconomicRegions,
    validators: ValidatorRegistry,
    clock: Arc<dyn Clock>,
    registry_timeout: Duration,
    settings: RwLock<Settings>,
}

impl SalesTax {
    /// Engine on the bundled tables with default configuration.
    pub fn new() -> Result<Self, SalesTaxError> {
        Self::builder().build()
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, SalesTaxError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> SalesTaxBuilder {
        SalesTaxBuilder::default()
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn rates(&self) -> &RateRepository {
        &self.rates
    }

    pub fn regions(&self) -> &EconomicRegions {
        &self.regions
    }

    /// Whether the country itself levies a non-zero tax right now.
    pub fn has_sales_tax(&self, country_code: &str) -> bool {
        let country = normalize_code(country_code);
        self.rates.country_rate(&country, self.clock.now()).is_taxed()
    }

    /// Whether the subdivision levies a non-zero tax of its own right now.
    pub fn has_state_sales_tax(&self, country_code: &str, state_code: &str) -> bool {
        let country = normalize_code(country_code);
        let state = normalize_code(state_code);
        self.rates
            .state_rate(&country, &state, self.clock.now())
            .is_taxed()
    }

    /// Resolve the tax to charge a buyer in `country_code` / `state_code`.
    ///
    /// # Errors
    ///
    /// Fails only when a registry lookup for `tax_number` fails or times out.
    #[tracing::instrument(level = "debug", skip(self, tax_number))]
    pub async fn get_sales_tax(
        &self,
        country_code: &str,
        state_code: Option<&str>,
        tax_number: Option<&str>,
    ) -> Result<TaxContext, SalesTaxError> {
        let settings = self.settings();
        let country = normalize_code(country_code);
        let state = normalize_state(state_code);
        let now = self.clock.now();

        let area = self.area(&settings, &country);
        let rates = match settings.origin_country.as_deref() {
            // Regional sales without regional tax are charged as domestic.
            Some(origin) if area == TaxArea::Regional && !settings.use_regional_tax => {
                tracing::debug!(origin, "regional tax disabled, charging origin rate");
                ResolvedRates {
                    country: self.rates.country_rate(origin, now),
                    state: EffectiveRate::none(),
                }
            }
            _ => self.rates.resolve(&country, state.as_deref(), now),
        };

        let status = if rates.has_any_tax() {
            self.exchange_status(&settings, &country, state.as_deref(), tax_number, now)
                .await?
        } else {
            ExchangeStatus::untaxed(area)
        };

        let context = build_tax_context(&rates, status);
        tracing::debug!(
            tax_type = %context.tax_type,
            rate = %context.rate,
            area = context.area.as_str(),
            exempt = context.exempt,
            "resolved sales tax"
        );
        Ok(context)
    }

    /// [`get_sales_tax`](Self::get_sales_tax) applied to a net `amount`.
    pub async fn get_amount_with_sales_tax(
        &self,
        country_code: &str,
        state_code: Option<&str>,
        amount: Decimal,
        tax_number: Option<&str>,
    ) -> Result<TaxAmount, SalesTaxError> {
        let context = self
            .get_sales_tax(country_code, state_code, tax_number)
            .await?;
        context.with_amount(amount)
    }

    /// Validate a tax number for `country_code`.
    ///
    /// `Ok(false)` for unknown jurisdictions, blank and malformed numbers;
    /// `Err` when the fraud check could not reach a verdict.
    pub async fn validate_tax_number(
        &self,
        country_code: &str,
        tax_number: &str,
    ) -> Result<bool, SalesTaxError> {
        let settings = self.settings();
        let country = normalize_code(country_code);
        self.validate(&settings, &country, Some(tax_number)).await
    }

    /// Classify the exchange and decide exemption for a buyer.
    pub async fn get_tax_exchange_status(
        &self,
        country_code: &str,
        state_code: Option<&str>,
        tax_number: Option<&str>,
    ) -> Result<ExchangeStatus, SalesTaxError> {
        let settings = self.settings();
        let country = normalize_code(country_code);
        let state = normalize_state(state_code);
        self.exchange_status(
            &settings,
            &country,
            state.as_deref(),
            tax_number,
            self.clock.now(),
        )
        .await
    }

    /// Whether a sale to this buyer is exempt (untaxed destination or
    /// cross-border B2B with a valid tax number).
    pub async fn is_tax_exempt(
        &self,
        country_code: &str,
        state_code: Option<&str>,
        tax_number: Option<&str>,
    ) -> Result<bool, SalesTaxError> {
        let status = self
            .get_tax_exchange_status(country_code, state_code, tax_number)
            .await?;
        Ok(status.exempt)
    }

    /// Set the seller's country; `None` or a blank code clears it.
    pub fn set_tax_origin_country(&self, country_code: Option<&str>, use_regional_tax: bool) {
        let origin = country_code
            .map(normalize_code)
            .filter(|c| !c.is_empty());
        tracing::debug!(origin = ?origin, use_regional_tax, "tax origin changed");

        let mut settings = self.settings.write();
        settings.origin_country = origin;
        settings.use_regional_tax = use_regional_tax;
    }

    /// When disabled, every supplied tax number is considered valid.
    pub fn toggle_enabled_tax_number_validation(&self, enabled: bool) {
        self.settings.write().validate_tax_numbers = enabled;
    }

    /// When enabled, format-valid numbers are confirmed against registries.
    pub fn toggle_enabled_tax_number_fraud_check(&self, enabled: bool) {
        self.settings.write().fraud_check = enabled;
    }

    fn area(&self, settings: &Settings, country: &str) -> TaxArea {
        let area = self
            .regions
            .classify(settings.origin_country.as_deref(), country);
        tracing::debug!(origin = ?settings.origin_country, country, area = area.as_str(), "classified trade area");
        area
    }

    async fn exchange_status(
        &self,
        settings: &Settings,
        country: &str,
        state: Option<&str>,
        tax_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ExchangeStatus, SalesTaxError> {
        let area = self.area(settings, country);

        if !self.rates.resolve(country, state, now).has_any_tax() {
            return Ok(ExchangeStatus::untaxed(area));
        }

        match tax_number.filter(|n| !n.is_empty()) {
            Some(number) => {
                if self.validate(settings, country, Some(number)).await? {
                    Ok(ExchangeStatus::business(area))
                } else {
                    Ok(ExchangeStatus::consumer(area))
                }
            }
            None => Ok(ExchangeStatus::consumer(area)),
        }
    }

    async fn validate(
        &self,
        settings: &Settings,
        country: &str,
        tax_number: Option<&str>,
    ) -> Result<bool, SalesTaxError> {
        if !settings.validate_tax_numbers {
            return Ok(true);
        }
        let Some(number) = clean_tax_number(tax_number) else {
            return Ok(false);
        };
        self.validators
            .validate(country, &number, settings.fraud_check, self.registry_timeout)
            .await
    }
}

/// Builder for a [`SalesTax`] engine with injected collaborators.
///
/// Anything not set falls back to the bundled tables, the system clock and
/// [`ValidatorRegistry::standard`].
#[derive(Debug, Default)]
pub struct SalesTaxBuilder {
    config: EngineConfig,
    rates: Option<RateRepository>,
    regions: Option<EconomicRegions>,
    validators: Option<ValidatorRegistry>,
    clock: Option<Arc<dyn Clock>>,
}

impl SalesTaxBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rates(mut self, rates: RateRepository) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn regions(mut self, regions: EconomicRegions) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = Some(validators);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<SalesTax, SalesTaxError> {
        let rates = match self.rates {
            Some(rates) => rates,
            None => RateRepository::bundled()?,
        };
        let regions = match self.regions {
            Some(regions) => regions,
            None => EconomicRegions::bundled()?,
        };
        let validators = match self.validators {
            Some(validators) => validators,
            None => ValidatorRegistry::standard(&self.config)?,
        };

        Ok(SalesTax {
            rates,
            regions,
            validators,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            registry_timeout: self.config.registry_timeout(),
            settings: RwLock::new(self.config.settings()),
        })
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn normalize_state(code: Option<&str>) -> Option<String> {
    code.map(normalize_code).filter(|c| !c.is_empty())
}
