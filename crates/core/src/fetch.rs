//! Page text retrieval from URLs, files, and stdin.
//!
//! [`PageSource`] is the seam the analyzer uses to turn a URL into plain
//! text. [`HttpPageSource`] is the network implementation: a GET with a
//! browser-like User-Agent, a status and content-type check, then
//! visible-text extraction with [`Document::main_text`].

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::parse::Document;
use crate::{Result, SerpLensError};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; serplens/1.0)".to_string() }
    }
}

impl FetchConfig {
    /// Builds a reqwest client honouring the timeout.
    pub fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .build()
            .map_err(SerpLensError::HttpError)
    }
}

/// Turns a URL into the plain text of the page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn page_text(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP and extracts their visible text.
pub struct HttpPageSource {
    client: Client,
    config: FetchConfig,
}

impl HttpPageSource {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self { client: config.client()?, config })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn page_text(&self, url: &str) -> Result<String> {
        let html = fetch_with_client(&self.client, url, &self.config).await?;
        let text = Document::parse(&html)?.main_text();

        if text.trim().is_empty() {
            return Err(SerpLensError::FetchFailure { url: url.to_string(), reason: "no visible text".to_string() });
        }

        debug!(url, chars = text.len(), "extracted page text");
        Ok(text)
    }
}

/// Validates that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| SerpLensError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SerpLensError::InvalidUrl(format!("unsupported scheme {} in {}", other, url))),
    }
}

/// Fetches HTML content from a URL.
///
/// Follows redirects, respects the configured timeout, and rejects error
/// statuses, non-text content types and empty bodies.
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let client = config.client()?;
    fetch_with_client(&client, url, config).await
}

async fn fetch_with_client(client: &Client, url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = validate_url(url)?;

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() { SerpLensError::Timeout { timeout: config.timeout } } else { SerpLensError::HttpError(e) }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SerpLensError::FetchFailure { url: url.to_string(), reason: format!("HTTP {}", status) });
    }

    if let Some(content_type) = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
        && !is_text_content_type(content_type)
    {
        return Err(SerpLensError::UnsupportedContent {
            url: url.to_string(),
            content_type: content_type.to_string(),
        });
    }

    let content = response.text().await?;
    if content.trim().is_empty() {
        return Err(SerpLensError::FetchFailure { url: url.to_string(), reason: "empty body".to_string() });
    }

    Ok(content)
}

/// Whether a Content-Type header value denotes something we can read as text.
fn is_text_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime.starts_with("text/") || mime == "application/xhtml+xml" || mime == "application/xml"
}

/// Reads text content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(SerpLensError::FetchFailure { url: path_buf.display().to_string(), reason: "file not found".to_string() })
    } else {
        fs::read_to_string(&path_buf).map_err(SerpLensError::from)
    }
}

/// Reads text content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(SerpLensError::from)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("serplens"));
    }

    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = fetch_url("not-a-url", &config).await;
        assert!(matches!(result, Err(SerpLensError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_page_source_rejects_non_http_scheme() {
        let source = HttpPageSource::new(FetchConfig::default()).unwrap();
        let result = source.page_text("ftp://example.com/file").await;
        assert!(matches!(result, Err(SerpLensError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_text_content_types() {
        assert!(is_text_content_type("text/html; charset=utf-8"));
        assert!(is_text_content_type("TEXT/PLAIN"));
        assert!(is_text_content_type("application/xhtml+xml"));
        assert!(!is_text_content_type("application/pdf"));
        assert!(!is_text_content_type("image/png"));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.txt");
        assert!(matches!(result, Err(SerpLensError::FetchFailure { .. })));
    }
}
