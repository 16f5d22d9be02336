//! Search-results retrieval.
//!
//! [`SearchProvider`] returns result URLs in rank order; [`ValueSerpClient`]
//! implements it over the ValueSERP JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::info;

use crate::{Result, SerpLensError};

const VALUESERP_ENDPOINT: &str = "https://api.valueserp.com/search";

/// Upper bound on results requested per query.
pub const MAX_RESULTS: usize = 30;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Result URLs for `query` at `location`, in search-engine rank order.
    ///
    /// An empty result is reported as [`SerpLensError::EmptyResultSet`].
    async fn search(&self, query: &str, location: &str, count: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct ValueSerpResponse {
    #[serde(default)]
    organic_results: Option<Vec<ValueSerpResult>>,
    #[serde(default)]
    request_info: Option<ValueSerpRequestInfo>,
}

#[derive(Debug, Deserialize)]
struct ValueSerpResult {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueSerpRequestInfo {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ValueSerpClient {
    api_key: String,
    client: Client,
    timeout: u64,
}

impl ValueSerpClient {
    pub fn new(api_key: &str, timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(SerpLensError::HttpError)?;
        Ok(Self { api_key: api_key.to_string(), client, timeout })
    }

    /// Builds a client, failing with [`SerpLensError::CredentialMissing`]
    /// when the key is absent or blank.
    pub fn from_credential(api_key: Option<&str>, timeout: u64) -> Result<Self> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::new(key, timeout),
            None => Err(SerpLensError::CredentialMissing { service: "valueserp".to_string() }),
        }
    }
}

#[async_trait]
impl SearchProvider for ValueSerpClient {
    async fn search(&self, query: &str, location: &str, count: usize) -> Result<Vec<String>> {
        let num = count.clamp(1, MAX_RESULTS).to_string();
        info!(query, location, num = %num, "ValueSERP search");

        let mut params = vec![("api_key", self.api_key.as_str()), ("q", query), ("num", num.as_str()), ("output", "json")];
        if !location.trim().is_empty() {
            params.push(("location", location));
        }

        let response = self.client.get(VALUESERP_ENDPOINT).query(&params).send().await.map_err(|e| {
            if e.is_timeout() { SerpLensError::Timeout { timeout: self.timeout } } else { SerpLensError::HttpError(e) }
        })?;

        let status = response.status();
        let body = response.text().await?;
        check_status(status)?;

        let urls = parse_valueserp_response(&body, query)?;
        info!(query, count = urls.len(), "ValueSERP search complete");
        Ok(urls)
    }
}

/// Maps a non-success ValueSERP status to an error.
pub(crate) fn check_status(status: StatusCode) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SerpLensError::InvalidCredential { service: "valueserp".to_string(), status: status.as_u16() });
    }
    if !status.is_success() {
        return Err(SerpLensError::FetchFailure { url: VALUESERP_ENDPOINT.to_string(), reason: format!("HTTP {}", status) });
    }
    Ok(())
}

/// Extracts organic result links, deduplicated, in rank order.
pub(crate) fn parse_valueserp_response(body: &str, query: &str) -> Result<Vec<String>> {
    let data: ValueSerpResponse = serde_json::from_str(body)?;

    if let Some(info) = &data.request_info
        && info.success == Some(false)
    {
        return Err(SerpLensError::FetchFailure {
            url: VALUESERP_ENDPOINT.to_string(),
            reason: info.message.clone().unwrap_or_else(|| "request failed".to_string()),
        });
    }

    let mut urls: Vec<String> = Vec::new();
    for link in data.organic_results.unwrap_or_default().into_iter().filter_map(|r| r.link) {
        let link = link.trim().to_string();
        if !link.is_empty() && !urls.contains(&link) {
            urls.push(link);
        }
    }

    if urls.is_empty() {
        return Err(SerpLensError::EmptyResultSet { query: query.to_string() });
    }

    Ok(urls)
}
