//! Gap analysis of one page against the corpus.
//!
//! The comparison is a pure function of a [`PageAnalysisRecord`] and the
//! [`CorpusStatistics`] built from competing pages. All output lists are
//! sorted with explicit tie-breaks, so a given input always produces the
//! same result.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::{
    ComparisonResult, CorpusStatistics, KeywordGap, MissingEntity, MissingKeyword, MissingTopic, PageAnalysisRecord,
    Priority, Recommendation,
};

/// How topic and entity coverage percentages are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverageMode {
    /// `|user ∩ corpus| / |corpus|`: share of corpus items the page covers.
    #[default]
    Intersection,
    /// `|user| / |corpus|`, capped at 100. Counts items without checking
    /// that they overlap.
    SetRatio,
}

/// Thresholds for [`compare`].
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    /// A keyword on at least this many pages is reported as missing (default: 3).
    pub min_pages: usize,
    /// Keywords on fewer pages are still reported when their importance
    /// exceeds this cutoff (default: none).
    pub importance_cutoff: Option<f64>,
    /// Added to the average score before inverting it (default: 1e-6).
    pub epsilon: f64,
    /// A keyword is under-used below this fraction of the corpus average (default: 0.5).
    pub gap_ratio: f64,
    /// Topics need a page count strictly above this (default: 1).
    pub min_topic_pages: usize,
    /// Entities need a total count strictly above this (default: 2).
    pub min_entity_count: usize,
    /// Topic coverage below this percentage triggers a recommendation (default: 70).
    pub topic_coverage_target: f64,
    /// Skip the topic-coverage recommendation when the corpus has no topics,
    /// e.g. when no annotation service is configured (default: false).
    pub require_corpus_topics: bool,
    pub coverage: CoverageMode,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            min_pages: 3,
            importance_cutoff: None,
            epsilon: 1e-6,
            gap_ratio: 0.5,
            min_topic_pages: 1,
            min_entity_count: 2,
            topic_coverage_target: 70.0,
            require_corpus_topics: false,
            coverage: CoverageMode::Intersection,
        }
    }
}

impl ComparisonConfig {
    pub fn builder() -> ComparisonConfigBuilder {
        ComparisonConfigBuilder::default()
    }
}

/// Builder for ComparisonConfig.
#[derive(Default)]
pub struct ComparisonConfigBuilder {
    config: ComparisonConfig,
}

impl ComparisonConfigBuilder {
    pub fn min_pages(mut self, value: usize) -> Self {
        self.config.min_pages = value;
        self
    }

    pub fn importance_cutoff(mut self, value: f64) -> Self {
        self.config.importance_cutoff = Some(value);
        self
    }

    pub fn epsilon(mut self, value: f64) -> Self {
        self.config.epsilon = value;
        self
    }

    pub fn gap_ratio(mut self, value: f64) -> Self {
        self.config.gap_ratio = value;
        self
    }

    pub fn min_topic_pages(mut self, value: usize) -> Self {
        self.config.min_topic_pages = value;
        self
    }

    pub fn min_entity_count(mut self, value: usize) -> Self {
        self.config.min_entity_count = value;
        self
    }

    pub fn topic_coverage_target(mut self, value: f64) -> Self {
        self.config.topic_coverage_target = value;
        self
    }

    pub fn require_corpus_topics(mut self, value: bool) -> Self {
        self.config.require_corpus_topics = value;
        self
    }

    pub fn coverage(mut self, value: CoverageMode) -> Self {
        self.config.coverage = value;
        self
    }

    pub fn build(self) -> ComparisonConfig {
        self.config
    }
}

/// [`compare`] bound to a configuration.
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    config: ComparisonConfig,
}

impl ComparisonEngine {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn compare(&self, user: &PageAnalysisRecord, corpus: &CorpusStatistics) -> ComparisonResult {
        compare(user, corpus, &self.config)
    }
}

/// Compares `user` against `corpus`.
///
/// Keyword membership is case-insensitive; topics and entities are matched
/// on their exact label or id. An empty corpus yields 0% coverage and no
/// findings.
pub fn compare(user: &PageAnalysisRecord, corpus: &CorpusStatistics, config: &ComparisonConfig) -> ComparisonResult {
    let mut user_keywords: BTreeMap<String, usize> = BTreeMap::new();
    for hit in &user.keywords {
        *user_keywords.entry(hit.keyword.to_lowercase()).or_default() += hit.occurrences;
    }

    let mut missing_keywords = Vec::new();
    let mut keyword_gaps = Vec::new();

    for (keyword, stat) in &corpus.keyword_stats {
        match user_keywords.get(&keyword.to_lowercase()) {
            Some(&user_occurrences) => {
                let avg = stat.avg_occurrences;
                if (user_occurrences as f64) < config.gap_ratio * avg {
                    keyword_gaps.push(KeywordGap {
                        keyword: keyword.clone(),
                        user_occurrences,
                        corpus_avg_occurrences: avg,
                        deficit_pct: (avg - user_occurrences as f64) / avg * 100.0,
                    });
                }
            }
            None => {
                let importance = importance(stat.urls_count, corpus.page_count, stat.avg_score, config.epsilon);
                let frequent = stat.urls_count >= config.min_pages;
                let important = config.importance_cutoff.is_some_and(|cutoff| importance > cutoff);
                if frequent || important {
                    missing_keywords.push(MissingKeyword {
                        keyword: keyword.clone(),
                        urls_count: stat.urls_count,
                        avg_score: stat.avg_score,
                        total_occurrences: stat.total_occurrences,
                        importance,
                    });
                }
            }
        }
    }

    missing_keywords.sort_by(|a, b| b.importance.total_cmp(&a.importance).then_with(|| a.keyword.cmp(&b.keyword)));
    keyword_gaps.sort_by(|a, b| b.deficit_pct.total_cmp(&a.deficit_pct).then_with(|| a.keyword.cmp(&b.keyword)));

    let user_topics: BTreeSet<&str> = user.topics.iter().map(|t| t.topic.as_str()).collect();
    let mut missing_topics: Vec<MissingTopic> = corpus
        .topic_stats
        .iter()
        .filter(|(topic, stat)| !user_topics.contains(topic.as_str()) && stat.count > config.min_topic_pages)
        .map(|(topic, stat)| MissingTopic { topic: topic.clone(), count: stat.count, avg_score: stat.avg_score })
        .collect();
    missing_topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));

    let user_entities: BTreeSet<&str> = user.entities.iter().map(|e| e.entity_id.as_str()).collect();
    let mut missing_entities: Vec<MissingEntity> = corpus
        .entity_stats
        .iter()
        .filter(|(id, stat)| !user_entities.contains(id.as_str()) && stat.total_count > config.min_entity_count)
        .map(|(id, stat)| MissingEntity {
            entity_id: id.clone(),
            entity_type: stat.entity_type.clone(),
            total_count: stat.total_count,
            avg_relevance: stat.avg_relevance,
        })
        .collect();
    missing_entities.sort_by(|a, b| b.total_count.cmp(&a.total_count).then_with(|| a.entity_id.cmp(&b.entity_id)));

    let topic_coverage_pct = coverage(&user_topics, corpus.topic_stats.keys(), config.coverage);
    let entity_coverage_pct = coverage(&user_entities, corpus.entity_stats.keys(), config.coverage);

    let mut result = ComparisonResult {
        topic_coverage_pct,
        entity_coverage_pct,
        missing_keywords,
        keyword_gaps,
        missing_topics,
        missing_entities,
        recommendations: Vec::new(),
    };
    result.recommendations = recommendations(&result, !corpus.topic_stats.is_empty(), config);

    debug!(
        missing_keywords = result.missing_keywords.len(),
        keyword_gaps = result.keyword_gaps.len(),
        missing_topics = result.missing_topics.len(),
        topic_coverage = result.topic_coverage_pct,
        "comparison complete"
    );
    result
}

/// `(urls_count / page_count) * 1 / (avg_score + epsilon)`.
fn importance(urls_count: usize, page_count: usize, avg_score: f64, epsilon: f64) -> f64 {
    if page_count == 0 {
        return 0.0;
    }
    (urls_count as f64 / page_count as f64) * (1.0 / (avg_score + epsilon))
}

fn coverage<'a>(user: &BTreeSet<&str>, corpus: impl ExactSizeIterator<Item = &'a String>, mode: CoverageMode) -> f64 {
    let corpus_len = corpus.len();
    if corpus_len == 0 {
        return 0.0;
    }
    let covered = match mode {
        CoverageMode::Intersection => corpus.filter(|item| user.contains(item.as_str())).count(),
        CoverageMode::SetRatio => user.len().min(corpus_len),
    };
    100.0 * covered as f64 / corpus_len as f64
}

fn recommendations(result: &ComparisonResult, has_corpus_topics: bool, config: &ComparisonConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if !result.missing_keywords.is_empty() {
        let names: Vec<&str> = result.missing_keywords.iter().take(5).map(|k| k.keyword.as_str()).collect();
        out.push(Recommendation {
            priority: Priority::High,
            message: format!("Add keywords used across competing pages: {}", names.join(", ")),
        });
    }

    if !result.keyword_gaps.is_empty() {
        let names: Vec<String> = result
            .keyword_gaps
            .iter()
            .take(5)
            .map(|g| format!("{} ({:.0}% below average)", g.keyword, g.deficit_pct))
            .collect();
        out.push(Recommendation {
            priority: Priority::Medium,
            message: format!("Use these keywords more often: {}", names.join(", ")),
        });
    }

    let topic_rule_applies = has_corpus_topics || !config.require_corpus_topics;
    if topic_rule_applies && result.topic_coverage_pct < config.topic_coverage_target {
        let mut message = format!(
            "Topic coverage is {:.1}%, below the {:.0}% target",
            result.topic_coverage_pct, config.topic_coverage_target
        );
        if !result.missing_topics.is_empty() {
            let names: Vec<&str> = result.missing_topics.iter().take(3).map(|t| t.topic.as_str()).collect();
            message.push_str(&format!("; consider covering: {}", names.join(", ")));
        }
        out.push(Recommendation { priority: Priority::Medium, message });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationStatus, EntityStat, KeywordHit, KeywordStat, TopicScore, TopicStat};
    use rstest::rstest;

    fn user(keywords: &[(&str, usize)], topics: &[&str]) -> PageAnalysisRecord {
        PageAnalysisRecord {
            url: "https://mine.test".to_string(),
            extracted_text: String::new(),
            word_count: 500,
            keywords: keywords
                .iter()
                .map(|(k, n)| KeywordHit { keyword: k.to_string(), score: 0.1, occurrences: *n, density_per_1000_words: 0.0 })
                .collect(),
            topics: topics.iter().map(|t| TopicScore { topic: t.to_string(), score: 0.5 }).collect(),
            entities: vec![],
            annotation: AnnotationStatus::Complete,
        }
    }

    fn keyword_stat(urls_count: usize, avg_score: f64, avg_occurrences: f64) -> KeywordStat {
        KeywordStat {
            total_occurrences: (avg_occurrences * urls_count as f64) as usize,
            urls_count,
            avg_score,
            avg_occurrences,
        }
    }

    fn corpus_with_keywords(keywords: &[(&str, KeywordStat)]) -> CorpusStatistics {
        CorpusStatistics {
            page_count: 10,
            keyword_stats: keywords.iter().map(|(k, s)| (k.to_string(), s.clone())).collect(),
            ..Default::default()
        }
    }

    fn corpus_with_topics(topics: &[(&str, usize)]) -> CorpusStatistics {
        CorpusStatistics {
            page_count: 10,
            topic_stats: topics
                .iter()
                .map(|(t, n)| (t.to_string(), TopicStat { count: *n, urls_count: *n, avg_score: 0.5 }))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_keyword_page_threshold() {
        let corpus = corpus_with_keywords(&[
            ("three pages", keyword_stat(3, 0.2, 2.0)),
            ("two pages", keyword_stat(2, 0.2, 2.0)),
        ]);

        let result = compare(&user(&[], &[]), &corpus, &ComparisonConfig::default());
        let names: Vec<&str> = result.missing_keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["three pages"]);

        let importance = result.missing_keywords[0].importance;
        assert!((importance - 0.3 / (0.2 + 1e-6)).abs() < 1e-9);
    }

    #[test]
    fn test_importance_cutoff_admits_rare_keywords() {
        let corpus = corpus_with_keywords(&[("rare", keyword_stat(2, 0.01, 1.0)), ("weak", keyword_stat(2, 0.9, 1.0))]);
        let config = ComparisonConfig::builder().importance_cutoff(5.0).build();

        let result = compare(&user(&[], &[]), &corpus, &config);
        let names: Vec<&str> = result.missing_keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["rare"]);
    }

    #[test]
    fn test_missing_keywords_sorted_by_importance() {
        let corpus = corpus_with_keywords(&[
            ("alpha", keyword_stat(3, 0.5, 1.0)),
            ("beta", keyword_stat(5, 0.1, 1.0)),
            ("gamma", keyword_stat(3, 0.5, 1.0)),
        ]);

        let result = compare(&user(&[], &[]), &corpus, &ComparisonConfig::default());
        let names: Vec<&str> = result.missing_keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["beta", "alpha", "gamma"]);
    }

    #[test]
    fn test_user_keywords_match_case_insensitively() {
        let corpus = corpus_with_keywords(&[("Widgets", keyword_stat(5, 0.1, 2.0))]);
        let result = compare(&user(&[("widgets", 2)], &[]), &corpus, &ComparisonConfig::default());
        assert!(result.missing_keywords.is_empty());
        assert!(result.keyword_gaps.is_empty());
    }

    #[rstest]
    #[case(1, 4.0, Some(75.0))]
    #[case(0, 4.0, Some(100.0))]
    #[case(2, 4.0, None)]
    #[case(3, 4.0, None)]
    fn test_keyword_gap(#[case] user_occurrences: usize, #[case] avg: f64, #[case] expected: Option<f64>) {
        let corpus = corpus_with_keywords(&[("widgets", keyword_stat(4, 0.1, avg))]);
        let result = compare(&user(&[("widgets", user_occurrences)], &[]), &corpus, &ComparisonConfig::default());

        assert_eq!(result.keyword_gaps.first().map(|g| g.deficit_pct), expected);
    }

    #[test]
    fn test_missing_topics_and_coverage() {
        let corpus = corpus_with_topics(&[("A", 4), ("B", 3), ("C", 2), ("D", 1)]);
        let result = compare(&user(&[], &["A"]), &corpus, &ComparisonConfig::default());

        let missing: Vec<&str> = result.missing_topics.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(missing, vec!["B", "C"]);
        assert_eq!(result.topic_coverage_pct, 25.0);
    }

    #[rstest]
    #[case(CoverageMode::Intersection, 0.0)]
    #[case(CoverageMode::SetRatio, 50.0)]
    fn test_coverage_modes_with_disjoint_topics(#[case] mode: CoverageMode, #[case] expected: f64) {
        let corpus = corpus_with_topics(&[("A", 2), ("B", 2), ("C", 2), ("D", 2)]);
        let config = ComparisonConfig::builder().coverage(mode).build();

        let result = compare(&user(&[], &["X", "Y"]), &corpus, &config);
        assert_eq!(result.topic_coverage_pct, expected);
    }

    #[test]
    fn test_set_ratio_is_capped() {
        let corpus = corpus_with_topics(&[("A", 2)]);
        let config = ComparisonConfig::builder().coverage(CoverageMode::SetRatio).build();
        let result = compare(&user(&[], &["A", "B", "C"]), &corpus, &config);
        assert_eq!(result.topic_coverage_pct, 100.0);
    }

    #[test]
    fn test_missing_entities_threshold() {
        let mut corpus = CorpusStatistics { page_count: 5, ..Default::default() };
        for (id, total) in [("Acme", 7), ("Paris", 3), ("Rare", 2)] {
            corpus.entity_stats.insert(
                id.to_string(),
                EntityStat {
                    total_count: total,
                    urls_count: 2,
                    avg_relevance: 0.5,
                    avg_confidence: 1.0,
                    entity_type: "Thing".to_string(),
                },
            );
        }

        let result = compare(&user(&[], &[]), &corpus, &ComparisonConfig::default());
        let ids: Vec<&str> = result.missing_entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["Acme", "Paris"]);
        assert_eq!(result.entity_coverage_pct, 0.0);
    }

    #[test]
    fn test_empty_corpus() {
        let result = compare(&user(&[("widgets", 3)], &["A"]), &CorpusStatistics::default(), &ComparisonConfig::default());
        assert_eq!(result.topic_coverage_pct, 0.0);
        assert_eq!(result.entity_coverage_pct, 0.0);
        assert!(result.missing_keywords.is_empty());
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].priority, Priority::Medium);
        assert_eq!(result.recommendations[0].message, "Topic coverage is 0.0%, below the 70% target");
    }

    #[test]
    fn test_topic_rule_fires_for_keyword_only_corpus() {
        let corpus = corpus_with_keywords(&[("widgets", keyword_stat(4, 0.1, 2.0))]);
        let page = user(&[("widgets", 2)], &[]);

        let result = compare(&page, &corpus, &ComparisonConfig::default());
        assert_eq!(result.topic_coverage_pct, 0.0);
        let topic: Vec<&Recommendation> =
            result.recommendations.iter().filter(|r| r.message.starts_with("Topic coverage")).collect();
        assert_eq!(topic.len(), 1);
        assert_eq!(topic[0].priority, Priority::Medium);
    }

    #[test]
    fn test_topic_rule_can_require_corpus_topics() {
        let config = ComparisonConfig::builder().require_corpus_topics(true).build();
        let keyword_only = corpus_with_keywords(&[("widgets", keyword_stat(4, 0.1, 2.0))]);
        let page = user(&[("widgets", 2)], &[]);

        let result = compare(&page, &keyword_only, &config);
        assert!(result.recommendations.iter().all(|r| !r.message.starts_with("Topic coverage")));

        let with_topics = corpus_with_topics(&[("A", 3), ("B", 2)]);
        let result = compare(&page, &with_topics, &config);
        assert!(result.recommendations.iter().any(|r| r.message.starts_with("Topic coverage is 0.0%")));
    }

    #[test]
    fn test_recommendations_are_ordered_and_stable() {
        let mut corpus = corpus_with_keywords(&[
            ("widgets", keyword_stat(6, 0.1, 4.0)),
            ("gadgets", keyword_stat(4, 0.2, 2.0)),
        ]);
        corpus.topic_stats = corpus_with_topics(&[("A", 4), ("B", 3), ("C", 2), ("D", 2), ("E", 2)]).topic_stats;
        let page = user(&[("widgets", 1)], &["A"]);
        let engine = ComparisonEngine::default();

        let first = engine.compare(&page, &corpus);
        let priorities: Vec<Priority> = first.recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Medium]);
        assert!(first.recommendations[0].message.contains("gadgets"));
        assert!(first.recommendations[1].message.contains("widgets (75% below average)"));
        assert!(first.recommendations[2].message.ends_with("B, C, D"));

        for _ in 0..5 {
            assert_eq!(engine.compare(&page, &corpus).recommendations, first.recommendations);
        }
    }
}
