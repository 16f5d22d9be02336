//! End-to-end SERP run: search, analyze, aggregate, compare.
//!
//! # Example
//!
//! ```rust,no_run
//! use serplens_core::{PipelineConfig, SerpPipeline, SerpRequest};
//!
//! # async fn run() -> serplens_core::Result<()> {
//! let pipeline = SerpPipeline::from_credentials(Some("serp-key"), None, PipelineConfig::default())?;
//! let request = SerpRequest::new("widgets", "Paris,France").user_url("https://example.com/widgets");
//!
//! if let Some(report) = pipeline.run(&request).await?.report() {
//!     println!("{} pages analyzed", report.pages.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::analyzer::{AnalyzerConfig, PageAnalyzer};
use crate::annotation::{SemanticAnnotator, TextRazorClient};
use crate::compare::{ComparisonConfig, compare};
use crate::fetch::{FetchConfig, HttpPageSource};
use crate::fetcher::{FetcherConfig, ParallelFetcher};
use crate::keywords::YakeExtractor;
use crate::model::{PageAnalysisRecord, SerpOutcome, SerpReport};
use crate::search::{MAX_RESULTS, SearchProvider, ValueSerpClient};
use crate::{Result, SerpLensError};

/// Configuration for a [`SerpPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub analyzer: AnalyzerConfig,
    pub fetcher: FetcherConfig,
    pub comparison: ComparisonConfig,
    /// Result URLs requested from the search service (default: 10, at most 30).
    pub search_results: usize,
    /// Give up on unfinished pages after this long (default: none).
    pub batch_timeout: Option<Duration>,
    /// Bars in the corpus keyword chart (default: 20).
    pub chart_keywords: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            analyzer: AnalyzerConfig::default(),
            fetcher: FetcherConfig::default(),
            comparison: ComparisonConfig::default(),
            search_results: 10,
            batch_timeout: None,
            chart_keywords: 20,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn fetch(mut self, value: FetchConfig) -> Self {
        self.config.fetch = value;
        self
    }

    pub fn analyzer(mut self, value: AnalyzerConfig) -> Self {
        self.config.analyzer = value;
        self
    }

    pub fn fetcher(mut self, value: FetcherConfig) -> Self {
        self.config.fetcher = value;
        self
    }

    pub fn comparison(mut self, value: ComparisonConfig) -> Self {
        self.config.comparison = value;
        self
    }

    /// Clamped to `1..=30`.
    pub fn search_results(mut self, value: usize) -> Self {
        self.config.search_results = value.clamp(1, MAX_RESULTS);
        self
    }

    pub fn batch_timeout(mut self, value: Duration) -> Self {
        self.config.batch_timeout = Some(value);
        self
    }

    pub fn chart_keywords(mut self, value: usize) -> Self {
        self.config.chart_keywords = value;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// One SERP analysis request.
#[derive(Debug, Clone, Default)]
pub struct SerpRequest {
    pub keyword: String,
    pub location: String,
    /// Page to compare against the corpus.
    pub user_url: Option<String>,
    /// Overrides the analyzer's keyword language.
    pub language: Option<String>,
}

impl SerpRequest {
    pub fn new(keyword: &str, location: &str) -> Self {
        Self { keyword: keyword.to_string(), location: location.to_string(), ..Default::default() }
    }

    pub fn user_url(mut self, url: &str) -> Self {
        self.user_url = Some(url.to_string());
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }
}

pub struct SerpPipeline {
    search: Option<Arc<dyn SearchProvider>>,
    analyzer: Arc<PageAnalyzer>,
    config: PipelineConfig,
}

impl SerpPipeline {
    /// Assembles a pipeline from its parts. Without a search provider only
    /// the single-page entry points work.
    pub fn new(search: Option<Arc<dyn SearchProvider>>, analyzer: Arc<PageAnalyzer>, config: PipelineConfig) -> Self {
        Self { search, analyzer, config }
    }

    /// Builds the networked pipeline: ValueSERP search, HTTP page fetching,
    /// local keyword extraction and, when `annotation_key` is set, TextRazor.
    ///
    /// Missing credentials are not an error here. A missing search key
    /// fails [`SerpPipeline::run`]; a missing annotation key only disables
    /// topics and entities.
    pub fn from_credentials(
        search_key: Option<&str>, annotation_key: Option<&str>, config: PipelineConfig,
    ) -> Result<Self> {
        let timeout = config.fetch.timeout;

        let search = match ValueSerpClient::from_credential(search_key, timeout) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn SearchProvider>),
            Err(SerpLensError::CredentialMissing { .. }) => None,
            Err(e) => return Err(e),
        };

        let annotator = TextRazorClient::from_credential(annotation_key, timeout)?
            .map(|client| Arc::new(client) as Arc<dyn SemanticAnnotator>);
        if annotator.is_none() {
            info!("no annotation credential, topics and entities disabled");
        }

        let source = HttpPageSource::new(config.fetch.clone())?;
        let analyzer =
            PageAnalyzer::new(Arc::new(source), Arc::new(YakeExtractor::default()), annotator, config.analyzer.clone());

        Ok(Self::new(search, Arc::new(analyzer), config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    /// Runs a full SERP analysis.
    ///
    /// Individual page failures never fail the run. When the search or the
    /// page batch yields nothing usable the result is
    /// [`SerpOutcome::Empty`], not an error.
    ///
    /// # Errors
    ///
    /// [`SerpLensError::CredentialMissing`] without a search provider,
    /// [`SerpLensError::ConfigError`] for a blank keyword, and any search
    /// service failure other than an empty result set.
    pub async fn run(&self, request: &SerpRequest) -> Result<SerpOutcome> {
        let query = request.keyword.trim();
        if query.is_empty() {
            return Err(SerpLensError::ConfigError("search keyword is empty".to_string()));
        }
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| SerpLensError::CredentialMissing { service: "valueserp".to_string() })?;

        let result_urls = match search.search(query, &request.location, self.config.search_results).await {
            Ok(urls) => urls,
            Err(SerpLensError::EmptyResultSet { query }) => {
                return Ok(SerpOutcome::Empty { query, reason: "the search returned no results".to_string() });
            }
            Err(e) => return Err(e),
        };
        info!(query, results = result_urls.len(), annotated = self.analyzer.has_annotator(), "search complete");

        let analyzer = match request.language.as_deref() {
            Some(language) if language != self.analyzer.config().language => {
                Arc::new(self.analyzer.with_language(language))
            }
            _ => Arc::clone(&self.analyzer),
        };

        let fetcher = ParallelFetcher::new(Arc::clone(&analyzer), self.config.fetcher.clone());
        let batch = match self.config.batch_timeout {
            Some(timeout) => fetcher.fetch_with_deadline(&result_urls, timeout).await,
            None => fetcher.fetch_until(&result_urls, std::future::pending()).await,
        };

        if batch.records.is_empty() {
            let attempted = result_urls.len().min(self.config.fetcher.max_pages);
            return Ok(SerpOutcome::Empty {
                query: query.to_string(),
                reason: format!("none of the {} result pages could be analyzed", attempted),
            });
        }

        let corpus = aggregate(&batch.records);
        if corpus.is_empty() {
            return Ok(SerpOutcome::Empty {
                query: query.to_string(),
                reason: "every analyzed page was excluded from the statistics".to_string(),
            });
        }

        let user_page = match request.user_url.as_deref() {
            Some(url) => match analyzer.analyze(url).await {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(url, error = %e, "could not analyze the page to compare, skipping comparison");
                    None
                }
            },
            None => None,
        };
        let comparison = user_page.as_ref().map(|page| compare(page, &corpus, &self.config.comparison));

        info!(
            query,
            pages = batch.records.len(),
            failed = batch.failed,
            cancelled = batch.cancelled,
            compared = comparison.is_some(),
            "SERP analysis complete"
        );

        Ok(SerpOutcome::Report(Box::new(SerpReport {
            query: query.to_string(),
            location: request.location.clone(),
            result_urls,
            top_keywords: corpus.top_keywords(self.config.chart_keywords),
            pages: batch.records,
            failed_pages: batch.failed,
            cancelled: batch.cancelled,
            corpus,
            user_page,
            comparison,
        })))
    }

    /// Analyzes a single page without any search.
    pub async fn analyze_page(&self, url: &str) -> Result<PageAnalysisRecord> {
        self.analyzer.analyze(url).await
    }

    /// Analyzes caller-supplied text without any fetch.
    pub async fn analyze_text(&self, label: &str, text: &str) -> Result<PageAnalysisRecord> {
        self.analyzer.analyze_text(label, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::PageSource;
    use crate::model::AnnotationStatus;
    use async_trait::async_trait;

    struct FixedSearch(Vec<String>);

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, query: &str, _location: &str, count: usize) -> Result<Vec<String>> {
            if self.0.is_empty() {
                return Err(SerpLensError::EmptyResultSet { query: query.to_string() });
            }
            Ok(self.0.iter().take(count).cloned().collect())
        }
    }

    struct BrokenSearch;

    #[async_trait]
    impl SearchProvider for BrokenSearch {
        async fn search(&self, _query: &str, _location: &str, _count: usize) -> Result<Vec<String>> {
            Err(SerpLensError::FetchFailure { url: "search".to_string(), reason: "HTTP 502".to_string() })
        }
    }

    struct FakeWeb;

    #[async_trait]
    impl PageSource for FakeWeb {
        async fn page_text(&self, url: &str) -> Result<String> {
            if url.contains("fail") {
                return Err(SerpLensError::FetchFailure { url: url.to_string(), reason: "HTTP 404".to_string() });
            }
            Ok(format!(
                "Blue widgets are the best widgets. Buy blue widgets from {}. Widgets ship fast and widgets last.",
                url
            ))
        }
    }

    fn urls(ok: usize, failing: usize) -> Vec<String> {
        let mut out: Vec<String> = (0..ok).map(|i| format!("https://shop{}.test/widgets", i)).collect();
        out.extend((0..failing).map(|i| format!("https://fail{}.test/", i)));
        out
    }

    fn pipeline(search: Option<Arc<dyn SearchProvider>>) -> SerpPipeline {
        let config = PipelineConfig::builder()
            .fetcher(FetcherConfig::builder().pacing_delay(Duration::ZERO).build())
            .build();
        let analyzer =
            PageAnalyzer::new(Arc::new(FakeWeb), Arc::new(YakeExtractor::default()), None, config.analyzer.clone());
        SerpPipeline::new(search, Arc::new(analyzer), config)
    }

    #[tokio::test]
    async fn test_partial_failures_still_produce_report() {
        let p = pipeline(Some(Arc::new(FixedSearch(urls(6, 4)))));
        let outcome = p.run(&SerpRequest::new("widgets", "Paris,France")).await.unwrap();

        let report = outcome.report().expect("report");
        assert_eq!(report.pages.len(), 6);
        assert_eq!(report.failed_pages, 4);
        assert_eq!(report.corpus.page_count, 6);
        assert_eq!(report.result_urls.len(), 10);
        assert!(report.pages.iter().all(|p| p.annotation == AnnotationStatus::Skipped));
        assert!(!report.top_keywords.is_empty());
        assert!(report.comparison.is_none());
    }

    #[tokio::test]
    async fn test_missing_search_provider_is_credential_error() {
        let err = pipeline(None).run(&SerpRequest::new("widgets", "")).await.unwrap_err();
        assert!(matches!(err, SerpLensError::CredentialMissing { ref service } if service == "valueserp"));
    }

    #[tokio::test]
    async fn test_blank_keyword_is_rejected() {
        let p = pipeline(Some(Arc::new(FixedSearch(urls(1, 0)))));
        assert!(matches!(p.run(&SerpRequest::new("  ", "")).await, Err(SerpLensError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_empty_search_is_empty_outcome() {
        let outcome = pipeline(Some(Arc::new(FixedSearch(vec![])))).run(&SerpRequest::new("widgets", "")).await.unwrap();
        assert!(matches!(outcome, SerpOutcome::Empty { ref query, .. } if query == "widgets"));
    }

    #[tokio::test]
    async fn test_search_failure_is_error() {
        let err = pipeline(Some(Arc::new(BrokenSearch))).run(&SerpRequest::new("widgets", "")).await.unwrap_err();
        assert!(matches!(err, SerpLensError::FetchFailure { .. }));
    }

    #[tokio::test]
    async fn test_all_pages_failing_is_empty_outcome() {
        let outcome =
            pipeline(Some(Arc::new(FixedSearch(urls(0, 3))))).run(&SerpRequest::new("widgets", "")).await.unwrap();

        match outcome {
            SerpOutcome::Empty { reason, .. } => assert!(reason.contains("none of the 3")),
            SerpOutcome::Report(_) => panic!("expected an empty outcome"),
        }
    }

    #[tokio::test]
    async fn test_user_page_comparison() {
        let p = pipeline(Some(Arc::new(FixedSearch(urls(4, 0)))));
        let request = SerpRequest::new("widgets", "").user_url("https://mine.test/widgets");

        let outcome = p.run(&request).await.unwrap();
        let report = outcome.report().expect("report");
        assert_eq!(report.user_page.as_ref().map(|u| u.url.as_str()), Some("https://mine.test/widgets"));
        assert!(report.comparison.is_some());
    }

    #[tokio::test]
    async fn test_user_page_failure_skips_comparison() {
        let p = pipeline(Some(Arc::new(FixedSearch(urls(4, 0)))));
        let request = SerpRequest::new("widgets", "").user_url("https://fail.test/mine");

        let outcome = p.run(&request).await.unwrap();
        let report = outcome.report().expect("report");
        assert!(report.user_page.is_none());
        assert!(report.comparison.is_none());
        assert_eq!(report.pages.len(), 4);
    }

    #[tokio::test]
    async fn test_single_page_entry_points() {
        let p = pipeline(None);
        let record = p.analyze_page("https://shop.test/widgets").await.unwrap();
        assert!(record.keywords.iter().any(|k| k.keyword.contains("widgets")));

        let text = p.analyze_text("draft", "Widgets and more widgets.").await.unwrap();
        assert_eq!(text.url, "draft");
    }

    #[test]
    fn test_config_builder_clamps_search_results() {
        assert_eq!(PipelineConfig::builder().search_results(100).build().search_results, MAX_RESULTS);
        assert_eq!(PipelineConfig::builder().search_results(0).build().search_results, 1);
    }

    #[test]
    fn test_from_credentials_without_search_key() {
        let p = SerpPipeline::from_credentials(None, None, PipelineConfig::default()).unwrap();
        assert!(!p.has_search());
    }
}
