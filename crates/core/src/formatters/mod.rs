pub mod json;
pub mod markdown;
pub mod text;

pub use json::{JsonConfig, JsonFormatter, outcome_to_json, record_to_json, report_to_json};
pub use markdown::{MarkdownConfig, MarkdownFormatter, record_to_markdown, report_to_markdown};
pub use text::{TextConfig, TextFormatter, record_to_text, report_to_text};

use crate::Result;
use crate::model::{PageAnalysisRecord, SerpReport};

/// Output formats shared by every renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned plain-text report.
    #[default]
    Text,
    /// Markdown with tables.
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

/// Renders a SERP report with each formatter's default configuration.
pub fn render_report(report: &SerpReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report_to_text(report, &TextConfig::default())),
        OutputFormat::Markdown => Ok(report_to_markdown(report, &MarkdownConfig::default())),
        OutputFormat::Json => report_to_json(report, &JsonConfig::default()),
    }
}

/// Renders a single page analysis with each formatter's default configuration.
pub fn render_record(record: &PageAnalysisRecord, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(record_to_text(record, &TextConfig::default())),
        OutputFormat::Markdown => Ok(record_to_markdown(record, &MarkdownConfig::default())),
        OutputFormat::Json => record_to_json(record, &JsonConfig::default()),
    }
}
