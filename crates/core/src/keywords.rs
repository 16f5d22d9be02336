//! Statistical keyword extraction.
//!
//! [`KeywordExtractor`] is the seam used by the analyzer. The bundled
//! [`YakeExtractor`] wraps the `yake-rust` implementation of YAKE, an
//! unsupervised single-document extractor. Lower scores mean more relevant
//! keywords.
//!
//! # Example
//!
//! ```rust
//! use serplens_core::keywords::{KeywordExtractor, YakeExtractor};
//!
//! let text = "Widgets are small devices. Blue widgets ship fast. Buy widgets online.";
//! let keywords = YakeExtractor::default().extract(text, "en", 5);
//! assert!(keywords.iter().any(|k| k.keyword.contains("widgets")));
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;
use yake_rust::{Config, StopWords};

/// Candidates requested from YAKE per keyword kept, so near-duplicates can
/// be dropped without coming up short.
const CANDIDATE_POOL: usize = 3;

/// A keyword as emitted by an extractor, before occurrence counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedKeyword {
    pub keyword: String,
    /// Lower means more relevant.
    pub score: f64,
}

/// Ranks the keywords of a text.
///
/// Implementations are local and infallible: a text with no usable words
/// yields an empty list.
pub trait KeywordExtractor: Send + Sync {
    /// Returns at most `max_keywords` keywords, most relevant first.
    fn extract(&self, text: &str, language: &str, max_keywords: usize) -> Vec<ExtractedKeyword>;
}

/// Configuration for [`YakeExtractor`].
#[derive(Debug, Clone)]
pub struct YakeConfig {
    /// Longest candidate n-gram, in words (default: 3).
    pub max_ngram: usize,
    /// Candidates more similar than this to a better-ranked one are dropped
    /// (default: 0.9).
    pub dedup_threshold: f64,
    /// Co-occurrence window used by the relatedness feature (default: 1).
    pub window: usize,
}

impl Default for YakeConfig {
    fn default() -> Self {
        Self { max_ngram: 3, dedup_threshold: 0.9, window: 1 }
    }
}

/// YAKE keyword extractor with `en`/`fr` stopword selection.
#[derive(Debug, Clone, Default)]
pub struct YakeExtractor {
    config: YakeConfig,
}

impl YakeExtractor {
    pub fn new(config: YakeConfig) -> Self {
        Self { config }
    }

    fn yake_config(&self) -> Config {
        Config {
            ngrams: self.config.max_ngram,
            window_size: self.config.window,
            remove_duplicates: false,
            ..Config::default()
        }
    }
}

impl KeywordExtractor for YakeExtractor {
    fn extract(&self, text: &str, language: &str, max_keywords: usize) -> Vec<ExtractedKeyword> {
        if max_keywords == 0 || text.trim().is_empty() {
            return Vec::new();
        }

        let Some(stop_words) = stop_words_for(language) else {
            warn!(language, "no stopword list available, skipping keyword extraction");
            return Vec::new();
        };

        let mut candidates: Vec<ExtractedKeyword> =
            yake_rust::get_n_best(max_keywords * CANDIDATE_POOL, text, &stop_words, &self.yake_config())
                .into_iter()
                .filter(|item| item.score.is_finite())
                .map(|item| ExtractedKeyword { keyword: item.keyword.to_lowercase(), score: item.score })
                .collect();
        candidates.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.keyword.cmp(&b.keyword)));

        dedup(candidates, self.config.dedup_threshold, max_keywords)
    }
}

/// Maps a language tag to a YAKE stopword list; French for `fr*`, English
/// for anything else.
fn stop_words_for(language: &str) -> Option<StopWords> {
    let code = match language.to_ascii_lowercase().as_str() {
        "fr" | "french" => "fr",
        tag if tag.starts_with("fr-") || tag.starts_with("fr_") => "fr",
        _ => "en",
    };
    StopWords::predefined(code)
}

/// Keeps ranked candidates whose normalized Levenshtein similarity to every
/// better-ranked kept candidate is at most `threshold`.
fn dedup(ranked: Vec<ExtractedKeyword>, threshold: f64, max_keywords: usize) -> Vec<ExtractedKeyword> {
    let mut selected: Vec<ExtractedKeyword> = Vec::with_capacity(max_keywords);
    for candidate in ranked {
        if selected.len() == max_keywords {
            break;
        }
        let duplicate =
            selected.iter().any(|kept| strsim::normalized_levenshtein(&kept.keyword, &candidate.keyword) > threshold);
        if !duplicate {
            selected.push(candidate);
        }
    }
    selected
}

/// Counts case-insensitive, non-overlapping literal occurrences of
/// `keyword` in `text`.
pub fn count_occurrences(text: &str, keyword: &str) -> usize {
    if keyword.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(&keyword.to_lowercase()).count()
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Occurrences per thousand words; zero for an empty text.
pub fn density_per_1000_words(occurrences: usize, words: usize) -> f64 {
    if words == 0 { 0.0 } else { occurrences as f64 * 1000.0 / words as f64 }
}
