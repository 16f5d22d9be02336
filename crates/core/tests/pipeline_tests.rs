//! Pipeline integration tests over local HTML fixtures
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serplens_core::*;

fn fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/serp/{}", name)
}

fn fixture_url(name: &str) -> String {
    format!("https://fixtures.test/{}", name)
}

/// Serves `https://fixtures.test/<file>` from the fixture directory.
struct FixtureSource;

#[async_trait]
impl PageSource for FixtureSource {
    async fn page_text(&self, url: &str) -> Result<String> {
        let name = url.rsplit('/').next().unwrap_or_default();
        let html = fetch_file(&fixture_path(name))
            .map_err(|e| SerpLensError::FetchFailure { url: url.to_string(), reason: e.to_string() })?;

        let text = Document::parse(&html)?.main_text();
        if text.trim().is_empty() {
            return Err(SerpLensError::FetchFailure { url: url.to_string(), reason: "no visible text".to_string() });
        }
        Ok(text)
    }
}

struct FixtureSearch;

#[async_trait]
impl SearchProvider for FixtureSearch {
    async fn search(&self, _query: &str, _location: &str, count: usize) -> Result<Vec<String>> {
        let names = ["acme.html", "widgetworld.html", "empty.html", "gizmo.html", "gone.html"];
        Ok(names.iter().take(count).map(|n| fixture_url(n)).collect())
    }
}

fn pipeline() -> SerpPipeline {
    let config = PipelineConfig::builder()
        .analyzer(AnalyzerConfig::builder().language("en").build())
        .fetcher(FetcherConfig::builder().max_concurrency(2).pacing_delay(Duration::ZERO).build())
        .comparison(ComparisonConfig::builder().min_pages(2).build())
        .build();
    let analyzer =
        PageAnalyzer::new(Arc::new(FixtureSource), Arc::new(YakeExtractor::default()), None, config.analyzer.clone());
    SerpPipeline::new(Some(Arc::new(FixtureSearch)), Arc::new(analyzer), config)
}

fn request() -> SerpRequest {
    SerpRequest::new("widgets", "United States").user_url(&fixture_url("mine.html"))
}

#[tokio::test]
async fn test_serp_run_over_fixtures() {
    let outcome = pipeline().run(&request()).await.expect("run should succeed");
    let report = outcome.report().expect("should produce a report");

    assert_eq!(report.result_urls.len(), 5);
    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.failed_pages, 2);
    assert!(!report.cancelled);

    assert_eq!(report.corpus.page_count, 3);
    assert!(!report.corpus.keyword_stats.is_empty());
    assert!(report.corpus.keyword_stats.values().all(|s| (1..=3).contains(&s.urls_count)));
    assert!(report.corpus.topic_stats.is_empty());
    assert!(!report.top_keywords.is_empty());

    let user_page = report.user_page.as_ref().expect("user page analyzed");
    assert_eq!(user_page.annotation, AnnotationStatus::Skipped);

    let comparison = report.comparison.as_ref().expect("comparison");
    assert_eq!(comparison.topic_coverage_pct, 0.0);
    assert_eq!(comparison.entity_coverage_pct, 0.0);
    assert!(comparison.missing_keywords.iter().all(|k| k.urls_count >= 2));
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let p = pipeline();
    let first = p.run(&request()).await.unwrap();
    let second = p.run(&request()).await.unwrap();

    let (first, second) = (first.report().unwrap(), second.report().unwrap());
    assert_eq!(first.corpus, second.corpus);
    assert_eq!(first.comparison, second.comparison);
}

#[tokio::test]
async fn test_report_renders_in_every_format() {
    let outcome = pipeline().run(&request()).await.unwrap();
    let report = outcome.report().unwrap();

    let text = render_report(report, OutputFormat::Text).unwrap();
    assert!(text.starts_with("SERP analysis: \"widgets\" (United States)"));
    assert!(text.contains("Pages analyzed: 3 of 5 results (2 failed)"));

    let markdown = render_report(report, OutputFormat::Markdown).unwrap();
    assert!(markdown.contains("# SERP analysis: widgets"));
    assert!(markdown.contains("| Keyword | Pages |"));

    let json: serde_json::Value = serde_json::from_str(&render_report(report, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["query"], "widgets");
    assert_eq!(json["pages"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_single_page_analysis() {
    let record = pipeline().analyze_page(&fixture_url("acme.html")).await.unwrap();

    assert!(record.word_count > 50);
    assert!(record.extracted_text.contains("Industrial widgets built to last"));
    assert!(!record.extracted_text.contains("Copyright"));
    assert!(record.keywords.len() <= 20);
}

#[tokio::test]
async fn test_page_without_text_fails() {
    let err = pipeline().analyze_page(&fixture_url("empty.html")).await.unwrap_err();
    assert!(matches!(err, SerpLensError::FetchFailure { ref reason, .. } if reason == "no visible text"));
}

#[tokio::test]
async fn test_history_records_runs() {
    let mut history = HistoryStore::new();
    let outcome = pipeline().run(&request()).await.unwrap();
    if let Some(report) = outcome.report() {
        history.record(HistoryKind::Serp, &report.query, &format!("{} pages", report.pages.len()));
    }

    assert_eq!(history.len(), 1);
    assert_eq!(history.latest().map(|e| e.summary.as_str()), Some("3 pages"));
}
