//! EU VIES REST API client for VAT number existence checks.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::lookup::RegistryLookup;
use crate::core::RegistryError;

pub const VIES_URL: &str = "https://ec.europa.eu/taxation_customs/vies/rest-api/check-vat-number";

/// Result of a VIES VAT number check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViesResult {
    /// Whether the VAT number is currently valid.
    pub valid: bool,
    /// Date of the request (YYYY-MM-DD).
    pub request_date: Option<String>,
    /// Registered company name (if available).
    pub name: Option<String>,
    /// Registered address (if available).
    pub address: Option<String>,
}

/// VIES API response structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViesApiResponse {
    valid: Option<bool>,
    request_date: Option<String>,
    name: Option<String>,
    address: Option<String>,
    // Error fields
    error_wrappers: Option<Vec<ViesErrorWrapper>>,
}

#[derive(Debug, Deserialize)]
struct ViesErrorWrapper {
    error: Option<String>,
    message: Option<String>,
}

/// VIES API request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViesRequest {
    country_code: String,
    vat_number: String,
}

/// Client for the VIES `check-vat-number` endpoint.
///
/// The VIES API has no authentication; it is a free public service.
#[derive(Debug, Clone)]
pub struct ViesClient {
    client: reqwest::Client,
    url: String,
}

impl ViesClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: VIES_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (e.g. the VIES test service).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Check a VAT number against VIES.
    ///
    /// `country_code` is the 2-letter VAT prefix (e.g. "DE", "EL").
    /// `vat_number` is the number part without the prefix.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Network` on connection issues,
    /// `RegistryError::Api` if a member state is unavailable,
    /// `RegistryError::Parse` on unexpected response formats.
    pub async fn check(
        &self,
        country_code: &str,
        vat_number: &str,
    ) -> Result<ViesResult, RegistryError> {
        let req = ViesRequest {
            country_code: country_code.to_uppercase(),
            vat_number: vat_number.to_string(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RegistryError::Api(format!("HTTP {status}: {body}")));
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<ViesResult, RegistryError> {
    let api_resp: ViesApiResponse =
        serde_json::from_str(body).map_err(|e| RegistryError::Parse(e.to_string()))?;

    // Check for API-level errors
    if let Some(err) = api_resp.error_wrappers.as_ref().and_then(|e| e.first()) {
        let msg = err
            .message
            .clone()
            .or_else(|| err.error.clone())
            .unwrap_or_else(|| "unknown error".into());
        return Err(RegistryError::Api(msg));
    }

    Ok(ViesResult {
        valid: api_resp.valid.unwrap_or(false),
        request_date: api_resp.request_date,
        name: api_resp.name.filter(|n| n != "---" && !n.is_empty()),
        address: api_resp.address.filter(|a| a != "---" && !a.is_empty()),
    })
}

#[async_trait]
impl RegistryLookup for ViesClient {
    fn name(&self) -> &'static str {
        "vies"
    }

    async fn is_registered(
        &self,
        country_code: &str,
        number: &str,
    ) -> Result<bool, RegistryError> {
        Ok(self.check(country_code, number).await?.valid)
    }
}
