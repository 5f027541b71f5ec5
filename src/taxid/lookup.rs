use async_trait::async_trait;

use crate::core::RegistryError;

/// Online existence check of a tax number against a government registry.
///
/// Implementations answer `Ok(false)` for numbers the registry does not
/// know, and `Err` only when the registry could not answer.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Short name for logs (e.g. "vies").
    fn name(&self) -> &'static str;

    /// `country_code` is the number's own prefix (e.g. "EL" for Greece),
    /// `number` the part after it.
    async fn is_registered(&self, country_code: &str, number: &str)
    -> Result<bool, RegistryError>;
}
