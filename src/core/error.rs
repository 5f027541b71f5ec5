use thiserror::Error;

/// Errors surfaced by the sales tax engine.
///
/// Unknown jurisdictions and unrecognized tax numbers are not errors: they
/// resolve to untaxed defaults and `false` respectively.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SalesTaxError {
    /// Reference data or engine configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A computed amount does not fit in a `Decimal`.
    #[error("amount overflow: {0}")]
    Overflow(String),

    /// An external tax-number registry could not answer.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure of an external tax-number registry lookup (VIES, HMRC, ...).
///
/// Distinct from a negative answer: a registry that says "not registered"
/// yields `Ok(false)`, never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// Network or HTTP transport error.
    #[error("registry network error: {0}")]
    Network(String),

    /// The registry answered with an error (e.g. member state unavailable).
    #[error("registry API error: {0}")]
    Api(String),

    /// The registry response could not be parsed.
    #[error("registry parse error: {0}")]
    Parse(String),

    /// No answer within the configured deadline.
    #[error("registry lookup timed out after {0}s")]
    Timeout(u64),
}

/// Error returned when a tax number fails format or check-digit validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxNumberFormatError {
    /// The rejected input value.
    pub value: String,
    /// Why the value failed validation.
    pub reason: String,
}

impl TaxNumberFormatError {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for TaxNumberFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid tax number '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for TaxNumberFormatError {}
