pub mod aggregate;
pub mod analyzer;
pub mod annotation;
pub mod compare;
pub mod error;
pub mod fetch;
pub mod fetcher;
pub mod formatters;
pub mod history;
pub mod keywords;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod search;

pub use aggregate::aggregate;
pub use analyzer::{AnalyzerConfig, AnalyzerConfigBuilder, AnnotationMode, PageAnalyzer};
pub use annotation::{Annotation, AnnotationInput, SemanticAnnotator, TextRazorClient};
pub use compare::{ComparisonConfig, ComparisonConfigBuilder, ComparisonEngine, CoverageMode, compare};
pub use error::{Result, SerpLensError};
pub use fetch::{FetchConfig, HttpPageSource, PageSource};
pub use fetch::{fetch_file, fetch_stdin, fetch_url, validate_url};
pub use fetcher::{BatchOutcome, FetcherConfig, FetcherConfigBuilder, ParallelFetcher};
pub use formatters::{JsonConfig, JsonFormatter, MarkdownConfig, MarkdownFormatter, TextConfig, TextFormatter};
pub use formatters::{OutputFormat, render_record, render_report};
pub use history::{HistoryEntry, HistoryKind, HistoryStore};
pub use keywords::{ExtractedKeyword, KeywordExtractor, YakeConfig, YakeExtractor};
pub use model::{
    AnnotationStatus, ChartPoint, ComparisonResult, CorpusStatistics, EntityMention, EntityStat, KeywordGap,
    KeywordHit, KeywordStat, MissingEntity, MissingKeyword, MissingTopic, PageAnalysisRecord, Priority,
    Recommendation, SerpOutcome, SerpReport, TopicScore, TopicStat,
};
pub use parse::Document;
pub use pipeline::{PipelineConfig, PipelineConfigBuilder, SerpPipeline, SerpRequest};
pub use search::{SearchProvider, ValueSerpClient};
