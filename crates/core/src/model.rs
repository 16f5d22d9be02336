//! Data model shared by the analyzer, aggregator and comparison engine.
//!
//! A [`PageAnalysisRecord`] is produced once per page and never mutated
//! afterwards. [`CorpusStatistics`] is folded from a batch of records and
//! [`ComparisonResult`] is derived from the statistics plus one record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One keyword emitted by the extractor, augmented with its counts in the
/// source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub keyword: String,
    /// Extractor score. Lower means more relevant.
    pub score: f64,
    /// Case-insensitive literal occurrences in the analyzed text.
    pub occurrences: usize,
    pub density_per_1000_words: f64,
}

/// A topic label returned by the annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub topic: String,
    pub score: f64,
}

/// An entity found on a page, with all of its mentions folded together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub entity_id: String,
    pub entity_type: String,
    pub relevance: f64,
    pub confidence: f64,
    pub occurrence_count: usize,
}

/// What happened to the semantic annotation step for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnotationStatus {
    Complete,
    /// No annotation credential was configured.
    Skipped,
    /// The service call failed; the record carries keywords only.
    Failed { reason: String },
}

impl AnnotationStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, AnnotationStatus::Complete)
    }
}

/// Analysis of a single page (or of a block of user text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysisRecord {
    pub url: String,
    /// Page text, truncated for storage.
    pub extracted_text: String,
    pub word_count: usize,
    pub keywords: Vec<KeywordHit>,
    pub topics: Vec<TopicScore>,
    pub entities: Vec<EntityMention>,
    pub annotation: AnnotationStatus,
}

impl PageAnalysisRecord {
    /// Keywords sorted by occurrence count, most frequent first, capped at `n`.
    ///
    /// This is the data behind the "top keywords by occurrences" chart.
    pub fn top_keywords_by_occurrences(&self, n: usize) -> Vec<&KeywordHit> {
        let mut hits: Vec<&KeywordHit> = self.keywords.iter().collect();
        hits.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.keyword.cmp(&b.keyword)));
        hits.truncate(n);
        hits
    }
}

/// Corpus-wide statistics for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordStat {
    pub total_occurrences: usize,
    pub urls_count: usize,
    pub avg_score: f64,
    /// Mean occurrences per page among the pages that use the keyword.
    pub avg_occurrences: f64,
}

/// Corpus-wide statistics for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStat {
    pub count: usize,
    pub urls_count: usize,
    pub avg_score: f64,
}

/// Corpus-wide statistics for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStat {
    pub total_count: usize,
    pub urls_count: usize,
    pub avg_relevance: f64,
    pub avg_confidence: f64,
    pub entity_type: String,
}

/// Statistics folded from every successfully analyzed page of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatistics {
    /// Number of records that contributed.
    pub page_count: usize,
    pub keyword_stats: BTreeMap<String, KeywordStat>,
    pub topic_stats: BTreeMap<String, TopicStat>,
    pub entity_stats: BTreeMap<String, EntityStat>,
    /// URLs of records excluded as malformed.
    pub skipped: Vec<String>,
}

impl CorpusStatistics {
    pub fn is_empty(&self) -> bool {
        self.page_count == 0
    }

    /// Corpus keywords ranked by total occurrences, capped at `n`.
    pub fn top_keywords(&self, n: usize) -> Vec<ChartPoint> {
        let mut points: Vec<ChartPoint> = self
            .keyword_stats
            .iter()
            .map(|(keyword, stat)| ChartPoint { label: keyword.clone(), value: stat.total_occurrences })
            .collect();
        points.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
        points.truncate(n);
        points
    }
}

/// One bar of a keyword chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: usize,
}

/// A corpus keyword the user page does not use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingKeyword {
    pub keyword: String,
    pub urls_count: usize,
    pub avg_score: f64,
    pub total_occurrences: usize,
    pub importance: f64,
}

/// A keyword the user page uses noticeably less than the corpus does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGap {
    pub keyword: String,
    pub user_occurrences: usize,
    pub corpus_avg_occurrences: f64,
    pub deficit_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingTopic {
    pub topic: String,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingEntity {
    pub entity_id: String,
    pub entity_type: String,
    pub total_count: usize,
    pub avg_relevance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
}

/// Gap analysis of one page against the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub topic_coverage_pct: f64,
    pub entity_coverage_pct: f64,
    pub missing_keywords: Vec<MissingKeyword>,
    pub keyword_gaps: Vec<KeywordGap>,
    pub missing_topics: Vec<MissingTopic>,
    pub missing_entities: Vec<MissingEntity>,
    pub recommendations: Vec<Recommendation>,
}

/// Everything a SERP run produces for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpReport {
    pub query: String,
    pub location: String,
    /// Result URLs in search-engine rank order, before truncation.
    pub result_urls: Vec<String>,
    pub pages: Vec<PageAnalysisRecord>,
    pub failed_pages: usize,
    /// True when the batch was cut short by the batch timeout.
    pub cancelled: bool,
    pub corpus: CorpusStatistics,
    pub top_keywords: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_page: Option<PageAnalysisRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
}

/// Outcome of a SERP run.
///
/// `Empty` is not an error: upstream services answered, but nothing usable
/// came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SerpOutcome {
    Report(Box<SerpReport>),
    Empty { query: String, reason: String },
}

impl SerpOutcome {
    pub fn report(&self) -> Option<&SerpReport> {
        match self {
            SerpOutcome::Report(report) => Some(report.as_ref()),
            SerpOutcome::Empty { .. } => None,
        }
    }
}
