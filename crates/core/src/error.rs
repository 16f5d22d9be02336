//! Error types for serplens operations.
//!
//! This module defines the main error type [`SerpLensError`] which covers
//! every failure the pipeline can surface: missing credentials, page fetch
//! and text extraction failures, remote annotation failures, empty search
//! results and records excluded from aggregation.
//!
//! Per-page failures are normally isolated by the fetcher and never reach
//! the caller; what does reach the caller is always one of these variants.
//!
//! # Example
//!
//! ```rust
//! use serplens_core::{Result, SerpLensError};
//!
//! fn require_key(key: Option<&str>) -> Result<&str> {
//!     key.ok_or(SerpLensError::CredentialMissing { service: "valueserp".to_string() })
//! }
//! ```

use thiserror::Error;

/// Main error type for search-result analysis.
#[derive(Error, Debug)]
pub enum SerpLensError {
    /// A credential required by an external service was not supplied.
    ///
    /// Fatal to the stage that needs the service only. A missing annotation
    /// credential degrades page analysis to keywords-only instead.
    #[error("Missing API credential for {service}")]
    CredentialMissing { service: String },

    /// An external service rejected the credential that was supplied.
    #[error("API credential rejected by {service} (HTTP {status})")]
    InvalidCredential { service: String, status: u16 },

    /// Page text could not be retrieved.
    ///
    /// Covers network errors, HTTP error statuses, empty bodies and pages
    /// with no visible text.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    /// The semantic annotation service errored, timed out or returned a
    /// non-success status.
    #[error("Annotation failed: {0}")]
    AnnotationFailure(String),

    /// The search service returned no usable result URLs.
    #[error("No search results for \"{query}\"")]
    EmptyResultSet { query: String },

    /// A per-page record was malformed and excluded from corpus statistics.
    #[error("Skipped record {url}: {reason}")]
    AggregationSkip { url: String, reason: String },

    /// HTTP request errors from reqwest.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response was not text (images, PDFs, archives...).
    #[error("Unsupported content type {content_type} at {url}")]
    UnsupportedContent { url: String, content_type: String },

    /// No text to analyze.
    #[error("No content could be extracted")]
    NoContent,

    /// JSON encoding or decoding errors.
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    /// File write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SerpLensError {
    /// Whether this error belongs to the per-page class that the fetcher
    /// isolates and drops rather than propagating.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            SerpLensError::FetchFailure { .. }
                | SerpLensError::UnsupportedContent { .. }
                | SerpLensError::NoContent
                | SerpLensError::Timeout { .. }
                | SerpLensError::HttpError(_)
                | SerpLensError::InvalidUrl(_)
        )
    }
}

impl From<serde_json::Error> for SerpLensError {
    fn from(err: serde_json::Error) -> Self {
        SerpLensError::SerializationError(err.to_string())
    }
}

/// Result type alias for SerpLensError.
pub type Result<T> = std::result::Result<T, SerpLensError>;
