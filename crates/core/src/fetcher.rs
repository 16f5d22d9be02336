//! Bounded, paced, cancellable batch analysis.
//!
//! [`ParallelFetcher`] runs the [`PageAnalyzer`] over the first `max_pages`
//! URLs with at most `max_concurrency` analyses in flight. Each task holds
//! its slot for `pacing_delay` after it completes, which caps the call rate
//! seen by the annotation service. Failed pages are logged and dropped; the
//! batch always completes with whatever succeeded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::analyzer::PageAnalyzer;
use crate::model::PageAnalysisRecord;

/// Configuration for [`ParallelFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum analyses in flight (default: 5).
    pub max_concurrency: usize,
    /// Pause observed by each task after it completes (default: 1s).
    pub pacing_delay: Duration,
    /// Only the first `max_pages` URLs, in rank order, are analyzed (default: 10).
    pub max_pages: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { max_concurrency: 5, pacing_delay: Duration::from_secs(1), max_pages: 10 }
    }
}

impl FetcherConfig {
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }
}

/// Builder for FetcherConfig.
#[derive(Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Values below 1 are treated as 1.
    pub fn max_concurrency(mut self, value: usize) -> Self {
        self.config.max_concurrency = value.max(1);
        self
    }

    pub fn pacing_delay(mut self, value: Duration) -> Self {
        self.config.pacing_delay = value;
        self
    }

    pub fn max_pages(mut self, value: usize) -> Self {
        self.config.max_pages = value;
        self
    }

    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

/// What a batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Successful records, in completion order.
    pub records: Vec<PageAnalysisRecord>,
    pub failed: usize,
    /// True when the cancellation signal fired before the batch drained.
    pub cancelled: bool,
}

impl BatchOutcome {
    fn absorb(&mut self, url: &str, result: Result<PageAnalysisRecord>) {
        match result {
            Ok(record) => {
                debug!(url, keywords = record.keywords.len(), "page analysis succeeded");
                self.records.push(record);
            }
            Err(e) => {
                if e.is_page_local() {
                    warn!(url, error = %e, "page analysis failed, dropping page");
                } else {
                    error!(url, error = %e, "page analysis failed outside the page, dropping page");
                }
                self.failed += 1;
            }
        }
    }
}

pub struct ParallelFetcher {
    analyzer: Arc<PageAnalyzer>,
    config: FetcherConfig,
}

impl ParallelFetcher {
    pub fn new(analyzer: Arc<PageAnalyzer>, config: FetcherConfig) -> Self {
        Self { analyzer, config }
    }

    /// Analyzes the batch to completion and returns the successful records.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<PageAnalysisRecord> {
        self.fetch_until(urls, std::future::pending::<()>()).await.records
    }

    /// Analyzes the batch, giving up on whatever is unfinished after `timeout`.
    pub async fn fetch_with_deadline(&self, urls: &[String], timeout: Duration) -> BatchOutcome {
        self.fetch_until(urls, tokio::time::sleep(timeout)).await
    }

    /// Analyzes the batch until it drains or `cancel` resolves.
    ///
    /// On cancellation, in-flight and unscheduled analyses are dropped and
    /// the records completed so far are returned. Each record is
    /// self-contained, so a partial batch is a valid aggregation input.
    pub async fn fetch_until<F>(&self, urls: &[String], cancel: F) -> BatchOutcome
    where
        F: Future<Output = ()>,
    {
        let batch: Vec<&str> = urls.iter().take(self.config.max_pages).map(String::as_str).collect();
        let scheduled = batch.len();
        let pacing = self.config.pacing_delay;
        let analyzer = &self.analyzer;

        info!(
            pages = scheduled,
            dropped = urls.len() - scheduled,
            concurrency = self.config.max_concurrency,
            "starting page analysis batch"
        );

        // Results are handed over before the pacing sleep, so a record is
        // kept even if the batch is cancelled while its slot is still held.
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut tasks = stream::iter(batch.into_iter().map(move |url| {
            let done_tx = done_tx.clone();
            async move {
                let result = analyzer.analyze(url).await;
                let _ = done_tx.send((url, result));
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
            }
        }))
        .buffer_unordered(self.config.max_concurrency.max(1));

        tokio::pin!(cancel);
        let mut outcome = BatchOutcome::default();

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    outcome.cancelled = true;
                    break;
                }
                Some((url, result)) = done_rx.recv() => outcome.absorb(url, result),
                next = tasks.next() => {
                    if next.is_none() {
                        break;
                    }
                }
            }
        }

        while let Ok((url, result)) = done_rx.try_recv() {
            outcome.absorb(url, result);
        }

        if outcome.cancelled {
            warn!(completed = outcome.records.len() + outcome.failed, scheduled, "page analysis batch cancelled");
        }
        info!(succeeded = outcome.records.len(), failed = outcome.failed, "page analysis batch finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerConfig;
    use crate::fetch::PageSource;
    use crate::keywords::YakeExtractor;
    use crate::SerpLensError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SlowSource {
        latency: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for SlowSource {
        async fn page_text(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("fail") {
                Err(SerpLensError::FetchFailure { url: url.to_string(), reason: "HTTP 500".to_string() })
            } else {
                Ok(format!("Widgets for {}. Buy widgets today.", url))
            }
        }
    }

    fn fetcher(source: Arc<SlowSource>, config: FetcherConfig) -> ParallelFetcher {
        let analyzer =
            PageAnalyzer::new(source, Arc::new(YakeExtractor::default()), None, AnalyzerConfig::default());
        ParallelFetcher::new(Arc::new(analyzer), config)
    }

    fn urls(n: usize, failing: &[usize]) -> Vec<String> {
        (0..n)
            .map(|i| if failing.contains(&i) { format!("https://fail{}.test", i) } else { format!("https://ok{}.test", i) })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_dropped() {
        let source = Arc::new(SlowSource { latency: Duration::from_millis(50), ..Default::default() });
        let f = fetcher(source, FetcherConfig::default());

        let outcome = f.fetch_until(&urls(10, &[1, 4, 6, 9]), std::future::pending()).await;
        assert_eq!(outcome.records.len(), 6);
        assert_eq!(outcome.failed, 4);
        assert!(!outcome.cancelled);
        assert!(outcome.records.iter().all(|r| r.url.contains("ok")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_truncated_to_max_pages() {
        let source = Arc::new(SlowSource::default());
        let f = fetcher(source.clone(), FetcherConfig { max_pages: 3, ..Default::default() });

        let records = f.fetch_all(&urls(8, &[])).await;
        assert_eq!(records.len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        let mut analyzed: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        analyzed.sort();
        assert_eq!(analyzed, vec!["https://ok0.test", "https://ok1.test", "https://ok2.test"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(SlowSource { latency: Duration::from_millis(100), ..Default::default() });
        let f = fetcher(source.clone(), FetcherConfig { max_concurrency: 2, ..Default::default() });

        f.fetch_all(&urls(8, &[])).await;
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_delay_applies_per_completed_task() {
        let source = Arc::new(SlowSource::default());
        let config = FetcherConfig { max_concurrency: 1, pacing_delay: Duration::from_secs(1), max_pages: 10 };
        let f = fetcher(source, config);

        let start = tokio::time::Instant::now();
        let records = f.fetch_all(&urls(4, &[2])).await;

        assert_eq!(records.len(), 3);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_completed_records() {
        let source = Arc::new(SlowSource { latency: Duration::from_secs(1), ..Default::default() });
        let config = FetcherConfig { max_concurrency: 1, pacing_delay: Duration::ZERO, max_pages: 10 };
        let f = fetcher(source, config);

        let outcome = f.fetch_with_deadline(&urls(5, &[]), Duration::from_millis(2500)).await;
        assert!(outcome.cancelled);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_pacing_keeps_finished_pages() {
        let source = Arc::new(SlowSource { latency: Duration::from_millis(100), ..Default::default() });
        let config = FetcherConfig { max_concurrency: 5, pacing_delay: Duration::from_secs(1), max_pages: 10 };
        let f = fetcher(source.clone(), config);

        let outcome = f.fetch_with_deadline(&urls(3, &[]), Duration::from_millis(500)).await;
        assert!(outcome.cancelled);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_pacing_counts_failures() {
        let source = Arc::new(SlowSource { latency: Duration::from_millis(100), ..Default::default() });
        let config = FetcherConfig { max_concurrency: 2, pacing_delay: Duration::from_secs(1), max_pages: 10 };
        let f = fetcher(source, config);

        let outcome = f.fetch_with_deadline(&urls(4, &[1]), Duration::from_millis(500)).await;
        assert!(outcome.cancelled);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.failed, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = FetcherConfig::builder().max_concurrency(0).pacing_delay(Duration::ZERO).max_pages(4).build();
        assert_eq!(config.max_concurrency, 1);
        assert!(config.pacing_delay.is_zero());
        assert_eq!(config.max_pages, 4);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let f = fetcher(Arc::new(SlowSource::default()), FetcherConfig::default());
        let outcome = f.fetch_until(&[], std::future::pending()).await;
        assert!(outcome.records.is_empty());
        assert!(!outcome.cancelled);
    }
}
