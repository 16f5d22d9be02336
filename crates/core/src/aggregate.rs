//! Folding page records into corpus statistics.
//!
//! [`aggregate`] is pure and order-independent: every average is computed
//! from the sorted list of contributing values, so any permutation of the
//! input yields bit-identical statistics.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::model::{CorpusStatistics, EntityStat, KeywordStat, PageAnalysisRecord, TopicStat};
use crate::{Result, SerpLensError};

#[derive(Default)]
struct KeywordAcc {
    total: usize,
    scores: Vec<f64>,
}

#[derive(Default)]
struct TopicAcc {
    scores: Vec<f64>,
}

#[derive(Default)]
struct EntityAcc {
    total: usize,
    relevances: Vec<f64>,
    confidences: Vec<f64>,
    types: BTreeMap<String, usize>,
}

/// Folds a batch of page records into [`CorpusStatistics`].
///
/// Malformed records (blank URL, non-finite scores) are excluded and listed
/// in [`CorpusStatistics::skipped`]. Repeated keys inside a single record
/// are merged first, so each record counts at most once towards
/// `urls_count`.
pub fn aggregate(records: &[PageAnalysisRecord]) -> CorpusStatistics {
    let mut keywords: BTreeMap<String, KeywordAcc> = BTreeMap::new();
    let mut topics: BTreeMap<String, TopicAcc> = BTreeMap::new();
    let mut entities: BTreeMap<String, EntityAcc> = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut page_count = 0;

    for record in records {
        if let Err(e) = validate(record) {
            warn!(error = %e, "excluding record from corpus statistics");
            skipped.push(record.url.clone());
            continue;
        }
        page_count += 1;

        for (keyword, (occurrences, score)) in fold_keywords(record) {
            let acc = keywords.entry(keyword.to_string()).or_default();
            acc.total += occurrences;
            acc.scores.push(score);
        }

        for (topic, score) in fold_topics(record) {
            topics.entry(topic.to_string()).or_default().scores.push(score);
        }

        for (id, folded) in fold_entities(record) {
            let acc = entities.entry(id.to_string()).or_default();
            acc.total += folded.count;
            acc.relevances.push(folded.relevance);
            acc.confidences.push(folded.confidence);
            *acc.types.entry(folded.entity_type.to_string()).or_default() += 1;
        }
    }

    skipped.sort();

    let keyword_stats = keywords
        .into_iter()
        .map(|(keyword, acc)| {
            let urls_count = acc.scores.len();
            let stat = KeywordStat {
                total_occurrences: acc.total,
                urls_count,
                avg_score: mean(acc.scores),
                avg_occurrences: acc.total as f64 / urls_count as f64,
            };
            (keyword, stat)
        })
        .collect();

    let topic_stats = topics
        .into_iter()
        .map(|(topic, acc)| {
            let urls_count = acc.scores.len();
            (topic, TopicStat { count: urls_count, urls_count, avg_score: mean(acc.scores) })
        })
        .collect();

    let entity_stats = entities
        .into_iter()
        .map(|(id, acc)| {
            let stat = EntityStat {
                total_count: acc.total,
                urls_count: acc.relevances.len(),
                entity_type: majority_type(&acc.types),
                avg_relevance: mean(acc.relevances),
                avg_confidence: mean(acc.confidences),
            };
            (id, stat)
        })
        .collect();

    let stats = CorpusStatistics { page_count, keyword_stats, topic_stats, entity_stats, skipped };
    debug!(
        pages = stats.page_count,
        keywords = stats.keyword_stats.len(),
        topics = stats.topic_stats.len(),
        entities = stats.entity_stats.len(),
        skipped = stats.skipped.len(),
        "corpus aggregated"
    );
    stats
}

fn validate(record: &PageAnalysisRecord) -> Result<()> {
    let reason = if record.url.trim().is_empty() {
        Some("empty url")
    } else if record.keywords.iter().any(|k| !k.score.is_finite()) {
        Some("non-finite keyword score")
    } else if record.topics.iter().any(|t| !t.score.is_finite()) {
        Some("non-finite topic score")
    } else if record.entities.iter().any(|e| !e.relevance.is_finite() || !e.confidence.is_finite()) {
        Some("non-finite entity score")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SerpLensError::AggregationSkip { url: record.url.clone(), reason: reason.to_string() }),
        None => Ok(()),
    }
}

/// keyword -> (summed occurrences, best score). Lower scores are better.
fn fold_keywords(record: &PageAnalysisRecord) -> BTreeMap<&str, (usize, f64)> {
    let mut folded: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for hit in &record.keywords {
        folded
            .entry(hit.keyword.as_str())
            .and_modify(|(occurrences, score)| {
                *occurrences += hit.occurrences;
                *score = score.min(hit.score);
            })
            .or_insert((hit.occurrences, hit.score));
    }
    folded
}

/// topic -> best score. Higher scores are better.
fn fold_topics(record: &PageAnalysisRecord) -> BTreeMap<&str, f64> {
    let mut folded: BTreeMap<&str, f64> = BTreeMap::new();
    for topic in &record.topics {
        folded.entry(topic.topic.as_str()).and_modify(|s| *s = s.max(topic.score)).or_insert(topic.score);
    }
    folded
}

struct FoldedEntity<'a> {
    count: usize,
    relevance: f64,
    confidence: f64,
    entity_type: &'a str,
}

fn fold_entities(record: &PageAnalysisRecord) -> BTreeMap<&str, FoldedEntity<'_>> {
    let mut folded: BTreeMap<&str, FoldedEntity<'_>> = BTreeMap::new();
    for entity in &record.entities {
        folded
            .entry(entity.entity_id.as_str())
            .and_modify(|f| {
                f.count += entity.occurrence_count;
                f.relevance = f.relevance.max(entity.relevance);
                f.confidence = f.confidence.max(entity.confidence);
            })
            .or_insert(FoldedEntity {
                count: entity.occurrence_count,
                relevance: entity.relevance,
                confidence: entity.confidence,
                entity_type: &entity.entity_type,
            });
    }
    folded
}

fn mean(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most frequent type; ties go to the lexicographically smallest.
///
/// Matches the first-seen type whenever records agree on the type, and
/// stays independent of record order when they disagree.
fn majority_type(types: &BTreeMap<String, usize>) -> String {
    let mut best: Option<(&String, usize)> = None;
    for (name, &count) in types {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.clone()).unwrap_or_else(|| "Unknown".to_string())
}
