//! Per-page analysis.
//!
//! [`PageAnalyzer`] turns one URL (or one block of user text) into a
//! [`PageAnalysisRecord`]: page text, keywords with occurrence counts, and,
//! when an annotator is configured, topics and entities.
//!
//! Annotation never blocks keyword output. Without an annotator the record
//! is marked [`AnnotationStatus::Skipped`]; when the annotation call fails
//! it is marked [`AnnotationStatus::Failed`] and still returned.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::annotation::{Annotation, AnnotationInput, SemanticAnnotator};
use crate::fetch::PageSource;
use crate::keywords::{KeywordExtractor, count_occurrences, density_per_1000_words, word_count};
use crate::model::{AnnotationStatus, KeywordHit, PageAnalysisRecord};
use crate::{Result, SerpLensError};

/// Where the annotation service reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationMode {
    /// Send the locally extracted page text.
    #[default]
    Text,
    /// Send the URL and let the service fetch and clean the page. The
    /// service's cleaned text, when returned, replaces the local text.
    Url,
}

/// Configuration for [`PageAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Language code passed to the keyword extractor (default: "fr").
    pub language: String,
    /// Maximum keywords per page (default: 20).
    pub max_keywords: usize,
    /// Characters of page text kept in the record (default: 5000).
    pub max_stored_chars: usize,
    pub annotation_mode: AnnotationMode,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { language: "fr".to_string(), max_keywords: 20, max_stored_chars: 5000, annotation_mode: AnnotationMode::Text }
    }
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::new()
    }
}

/// Builder for AnalyzerConfig.
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn new() -> Self {
        Self { config: AnalyzerConfig::default() }
    }

    pub fn language(mut self, value: &str) -> Self {
        self.config.language = value.to_string();
        self
    }

    pub fn max_keywords(mut self, value: usize) -> Self {
        self.config.max_keywords = value;
        self
    }

    pub fn max_stored_chars(mut self, value: usize) -> Self {
        self.config.max_stored_chars = value;
        self
    }

    pub fn annotation_mode(mut self, value: AnnotationMode) -> Self {
        self.config.annotation_mode = value;
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

impl Default for AnalyzerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyzes one page at a time. Cheap to share across concurrent tasks.
pub struct PageAnalyzer {
    source: Arc<dyn PageSource>,
    extractor: Arc<dyn KeywordExtractor>,
    annotator: Option<Arc<dyn SemanticAnnotator>>,
    config: AnalyzerConfig,
}

impl PageAnalyzer {
    pub fn new(
        source: Arc<dyn PageSource>, extractor: Arc<dyn KeywordExtractor>,
        annotator: Option<Arc<dyn SemanticAnnotator>>, config: AnalyzerConfig,
    ) -> Self {
        Self { source, extractor, annotator, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Whether topics and entities will be requested.
    pub fn has_annotator(&self) -> bool {
        self.annotator.is_some()
    }

    /// A copy of this analyzer extracting keywords for `language`.
    pub fn with_language(&self, language: &str) -> Self {
        Self {
            source: Arc::clone(&self.source),
            extractor: Arc::clone(&self.extractor),
            annotator: self.annotator.clone(),
            config: AnalyzerConfig { language: language.to_string(), ..self.config.clone() },
        }
    }

    /// Fetches and analyzes one page.
    ///
    /// # Errors
    ///
    /// Returns [`SerpLensError::FetchFailure`] (or the more specific
    /// [`SerpLensError::InvalidUrl`]) when the page text cannot be
    /// retrieved. Annotation failures are never returned.
    pub async fn analyze(&self, url: &str) -> Result<PageAnalysisRecord> {
        let text = self.source.page_text(url).await.map_err(|e| match e {
            SerpLensError::FetchFailure { .. } | SerpLensError::InvalidUrl(_) => e,
            other => SerpLensError::FetchFailure { url: url.to_string(), reason: other.to_string() },
        })?;

        let input = match self.config.annotation_mode {
            AnnotationMode::Text => AnnotationInput::Text(&text),
            AnnotationMode::Url => AnnotationInput::Url(url),
        };
        let (annotation, status) = self.annotate(url, input).await;

        let text = match (self.config.annotation_mode, annotation.cleaned_text.as_deref()) {
            (AnnotationMode::Url, Some(cleaned)) if !cleaned.trim().is_empty() => cleaned.to_string(),
            _ => text,
        };

        Ok(self.build_record(url, &text, annotation, status))
    }

    /// Analyzes caller-supplied text labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns [`SerpLensError::NoContent`] for blank text.
    pub async fn analyze_text(&self, label: &str, text: &str) -> Result<PageAnalysisRecord> {
        if text.trim().is_empty() {
            return Err(SerpLensError::NoContent);
        }

        let (annotation, status) = self.annotate(label, AnnotationInput::Text(text)).await;
        Ok(self.build_record(label, text, annotation, status))
    }

    async fn annotate(&self, label: &str, input: AnnotationInput<'_>) -> (Annotation, AnnotationStatus) {
        let Some(annotator) = &self.annotator else {
            return (Annotation::default(), AnnotationStatus::Skipped);
        };

        match annotator.annotate(input).await {
            Ok(annotation) => (annotation, AnnotationStatus::Complete),
            Err(e) => {
                warn!(url = label, error = %e, "annotation failed, keeping keywords only");
                (Annotation::default(), AnnotationStatus::Failed { reason: e.to_string() })
            }
        }
    }

    fn build_record(
        &self, url: &str, text: &str, annotation: Annotation, status: AnnotationStatus,
    ) -> PageAnalysisRecord {
        let words = word_count(text);
        let keywords: Vec<KeywordHit> = self
            .extractor
            .extract(text, &self.config.language, self.config.max_keywords)
            .into_iter()
            .map(|kw| {
                let occurrences = count_occurrences(text, &kw.keyword);
                KeywordHit {
                    density_per_1000_words: density_per_1000_words(occurrences, words),
                    keyword: kw.keyword,
                    score: kw.score,
                    occurrences,
                }
            })
            .collect();

        debug!(url, words, keywords = keywords.len(), topics = annotation.topics.len(), "page analyzed");

        PageAnalysisRecord {
            url: url.to_string(),
            extracted_text: text.chars().take(self.config.max_stored_chars).collect(),
            word_count: words,
            keywords,
            topics: annotation.topics,
            entities: annotation.entities,
            annotation: status,
        }
    }
}
