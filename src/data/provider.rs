//! Alpha Vantage economic indicators API client
//!
//! Fetches raw indicator payloads and resolves them into a `ProviderPayload`
//! once, at the fetch boundary, so callers never sniff JSON fields themselves.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::Indicator;

/// Base URL for the Alpha Vantage query API
const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Fields Alpha Vantage uses in place of `data` when it rejects a request
const ERROR_MARKERS: [&str; 3] = ["Note", "Information", "Error Message"];

/// Errors that can occur when fetching indicator data
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Provider answered with a non-success status
    #[error("Alpha Vantage API error: {0}")]
    Status(reqwest::StatusCode),
}

/// A provider response, classified by whether it carries usable data
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    /// Payload with a `data` array and no error marker
    Ok(Value),
    /// Payload carrying a `Note`, `Information` or `Error Message` marker
    RateLimited(Value),
    /// Payload without a `data` array
    Malformed(Value),
}

impl ProviderPayload {
    /// Classifies a raw response body
    ///
    /// An error marker wins even when a `data` array is present alongside it.
    pub fn classify(raw: Value) -> Self {
        if ERROR_MARKERS.iter().any(|marker| raw.get(*marker).is_some()) {
            return ProviderPayload::RateLimited(raw);
        }
        if raw.get("data").is_some_and(Value::is_array) {
            ProviderPayload::Ok(raw)
        } else {
            ProviderPayload::Malformed(raw)
        }
    }

    /// Returns true when the payload can be cached and normalized
    pub fn is_ok(&self) -> bool {
        matches!(self, ProviderPayload::Ok(_))
    }

    /// The marker message, if the provider sent one
    pub fn marker_message(&self) -> Option<&str> {
        let raw = self.raw();
        ERROR_MARKERS
            .iter()
            .find_map(|marker| raw.get(*marker))
            .and_then(Value::as_str)
    }

    /// Borrows the raw body regardless of classification
    pub fn raw(&self) -> &Value {
        match self {
            ProviderPayload::Ok(v)
            | ProviderPayload::RateLimited(v)
            | ProviderPayload::Malformed(v) => v,
        }
    }

    /// Consumes the payload, returning the raw body
    pub fn into_raw(self) -> Value {
        match self {
            ProviderPayload::Ok(v)
            | ProviderPayload::RateLimited(v)
            | ProviderPayload::Malformed(v) => v,
        }
    }
}

/// Client for fetching indicator series from Alpha Vantage
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ProviderClient {
    /// Create a new ProviderClient with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (for testing against a local server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the query parameters for an indicator
    fn query(&self, indicator: &Indicator) -> Vec<(&'static str, String)> {
        let mut params = vec![("function", indicator.function.to_string())];
        if let Some(interval) = indicator.interval {
            params.push(("interval", interval.to_string()));
        }
        if let Some(maturity) = indicator.maturity {
            params.push(("maturity", maturity.to_string()));
        }
        params.push(("apikey", self.api_key.clone()));
        params
    }

    /// Fetch the raw payload for an indicator
    ///
    /// # Returns
    /// * `Ok(ProviderPayload)` - The classified response body
    /// * `Err(ProviderError)` - If the request fails, the status is not a success,
    ///   or the body is not JSON
    pub async fn fetch(&self, indicator: &Indicator) -> Result<ProviderPayload, ProviderError> {
        debug!(
            indicator = indicator.key,
            function = indicator.function,
            "requesting indicator"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(indicator))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let text = response.text().await?;
        let raw: Value = serde_json::from_str(&text)?;
        let payload = ProviderPayload::classify(raw);

        if let Some(message) = payload.marker_message() {
            warn!(indicator = indicator.key, message, "provider rejected request");
        }

        Ok(payload)
    }
}
