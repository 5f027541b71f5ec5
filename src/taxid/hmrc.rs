//! HMRC "check a UK VAT number" API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::lookup::RegistryLookup;
use crate::core::RegistryError;

pub const HMRC_URL: &str = "https://api.service.hmrc.gov.uk";

const HMRC_ACCEPT: &str = "application/vnd.hmrc.2.0+json";

/// Registered trader returned by a successful lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmrcTarget {
    pub name: Option<String>,
    pub vat_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HmrcLookupResponse {
    target: Option<HmrcTarget>,
}

/// Client for the HMRC VAT registration lookup.
#[derive(Debug, Clone)]
pub struct HmrcClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HmrcClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: HMRC_URL.to_string(),
            bearer_token: None,
        })
    }

    /// Point the client at another host (e.g. the HMRC sandbox).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Application-restricted OAuth token for API version 2.0.
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    /// Look up a UK VAT registration number (without the "GB" prefix).
    ///
    /// Returns `Ok(None)` when HMRC does not know the number.
    pub async fn lookup(&self, vrn: &str) -> Result<Option<HmrcTarget>, RegistryError> {
        let url = format!(
            "{}/organisations/vat/check-vat-number/lookup/{vrn}",
            self.base_url.trim_end_matches('/')
        );

        let mut req = self.client.get(url).header("Accept", HMRC_ACCEPT);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

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

fn parse_response(body: &str) -> Result<Option<HmrcTarget>, RegistryError> {
    let resp: HmrcLookupResponse =
        serde_json::from_str(body).map_err(|e| RegistryError::Parse(e.to_string()))?;
    match resp.target {
        Some(target) => Ok(Some(target)),
        None => Err(RegistryError::Parse("response has no target".into())),
    }
}

#[async_trait]
impl RegistryLookup for HmrcClient {
    fn name(&self) -> &'static str {
        "hmrc"
    }

    async fn is_registered(
        &self,
        _country_code: &str,
        number: &str,
    ) -> Result<bool, RegistryError> {
        Ok(self.lookup(number).await?.is_some())
    }
}
