use crate::formatters::text::annotation_label;
use crate::model::{ComparisonResult, CorpusStatistics, PageAnalysisRecord, SerpReport};

/// Configuration for Markdown output
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Rows shown per table (0 = all)
    pub max_rows: usize,
    /// Include TOML frontmatter with the query and run counts
    pub include_frontmatter: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { max_rows: 10, include_frontmatter: false }
    }
}

/// Markdown formatter for reports and single-page analyses
pub struct MarkdownFormatter {
    config: MarkdownConfig,
}

impl MarkdownFormatter {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, report: &SerpReport) -> String {
        report_to_markdown(report, &self.config)
    }

    pub fn record(&self, record: &PageAnalysisRecord) -> String {
        record_to_markdown(record, &self.config)
    }
}

/// Render a SERP report as Markdown
pub fn report_to_markdown(report: &SerpReport, config: &MarkdownConfig) -> String {
    let mut out = String::new();

    if config.include_frontmatter {
        out.push_str(&generate_frontmatter(report));
        out.push('\n');
    }

    out.push_str(&format!("# SERP analysis: {}\n\n", escape(&report.query)));
    if !report.location.is_empty() {
        out.push_str(&format!("Location: {}\n\n", escape(&report.location)));
    }
    out.push_str(&format!(
        "Analyzed **{}** of {} result pages ({} failed).\n",
        report.pages.len(),
        report.result_urls.len(),
        report.failed_pages
    ));
    if report.cancelled {
        out.push_str("\n> The batch hit its time limit; statistics cover the pages finished before it.\n");
    }

    push_corpus(&mut out, &report.corpus, config.max_rows);

    if let Some(comparison) = &report.comparison {
        let target = report.user_page.as_ref().map(|p| p.url.as_str()).unwrap_or("your page");
        push_comparison(&mut out, target, comparison, config.max_rows);
    }

    out
}

/// Render one page analysis as Markdown
pub fn record_to_markdown(record: &PageAnalysisRecord, config: &MarkdownConfig) -> String {
    let mut out = format!("# {}\n\n", escape(&record.url));
    out.push_str(&format!("- Words: {}\n", record.word_count));
    out.push_str(&format!("- Annotation: {}\n", escape(&annotation_label(record))));

    if !record.keywords.is_empty() {
        out.push_str("\n## Keywords\n\n");
        let rows: Vec<Vec<String>> = limit(&record.keywords, config.max_rows)
            .iter()
            .map(|k| {
                vec![
                    escape(&k.keyword),
                    format!("{:.4}", k.score),
                    k.occurrences.to_string(),
                    format!("{:.1}", k.density_per_1000_words),
                ]
            })
            .collect();
        out.push_str(&table(&["Keyword", "Score", "Occurrences", "Per 1000 words"], &rows));
    }

    if !record.topics.is_empty() {
        out.push_str("\n## Topics\n\n");
        let rows: Vec<Vec<String>> = limit(&record.topics, config.max_rows)
            .iter()
            .map(|t| vec![escape(&t.topic), format!("{:.2}", t.score)])
            .collect();
        out.push_str(&table(&["Topic", "Score"], &rows));
    }

    if !record.entities.is_empty() {
        out.push_str("\n## Entities\n\n");
        let rows: Vec<Vec<String>> = limit(&record.entities, config.max_rows)
            .iter()
            .map(|e| {
                vec![
                    escape(&e.entity_id),
                    escape(&e.entity_type),
                    format!("{:.2}", e.relevance),
                    e.occurrence_count.to_string(),
                ]
            })
            .collect();
        out.push_str(&table(&["Entity", "Type", "Relevance", "Mentions"], &rows));
    }

    out
}

/// Generate TOML frontmatter describing the run
fn generate_frontmatter(report: &SerpReport) -> String {
    let mut frontmatter = String::from("+++");
    frontmatter.push_str(&format!("\nquery = {}", toml_escape_string(&report.query)));
    if !report.location.is_empty() {
        frontmatter.push_str(&format!("\nlocation = {}", toml_escape_string(&report.location)));
    }
    frontmatter.push_str(&format!("\npages = {}", report.pages.len()));
    frontmatter.push_str(&format!("\nfailed_pages = {}", report.failed_pages));
    frontmatter.push_str("\n+++\n");
    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
}

fn push_corpus(out: &mut String, corpus: &CorpusStatistics, max_rows: usize) {
    out.push_str("\n## Corpus\n");

    let mut keywords: Vec<_> = corpus.keyword_stats.iter().collect();
    keywords.sort_by(|a, b| b.1.urls_count.cmp(&a.1.urls_count).then_with(|| a.1.avg_score.total_cmp(&b.1.avg_score)));
    if !keywords.is_empty() {
        out.push_str("\n### Keywords\n\n");
        let rows: Vec<Vec<String>> = limit(&keywords, max_rows)
            .iter()
            .map(|(k, s)| {
                vec![
                    escape(k),
                    s.urls_count.to_string(),
                    s.total_occurrences.to_string(),
                    format!("{:.1}", s.avg_occurrences),
                    format!("{:.4}", s.avg_score),
                ]
            })
            .collect();
        out.push_str(&table(&["Keyword", "Pages", "Occurrences", "Avg per page", "Avg score"], &rows));
    }

    let mut topics: Vec<_> = corpus.topic_stats.iter().collect();
    topics.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
    if !topics.is_empty() {
        out.push_str("\n### Topics\n\n");
        let rows: Vec<Vec<String>> = limit(&topics, max_rows)
            .iter()
            .map(|(t, s)| vec![escape(t), s.count.to_string(), format!("{:.2}", s.avg_score)])
            .collect();
        out.push_str(&table(&["Topic", "Pages", "Avg score"], &rows));
    }

    let mut entities: Vec<_> = corpus.entity_stats.iter().collect();
    entities.sort_by(|a, b| b.1.total_count.cmp(&a.1.total_count).then_with(|| a.0.cmp(b.0)));
    if !entities.is_empty() {
        out.push_str("\n### Entities\n\n");
        let rows: Vec<Vec<String>> = limit(&entities, max_rows)
            .iter()
            .map(|(id, s)| vec![escape(id), escape(&s.entity_type), s.total_count.to_string(), s.urls_count.to_string()])
            .collect();
        out.push_str(&table(&["Entity", "Type", "Mentions", "Pages"], &rows));
    }
}

fn push_comparison(out: &mut String, target: &str, comparison: &ComparisonResult, max_rows: usize) {
    out.push_str(&format!("\n## Comparison with {}\n\n", escape(target)));
    out.push_str(&format!("- Topic coverage: {:.1}%\n", comparison.topic_coverage_pct));
    out.push_str(&format!("- Entity coverage: {:.1}%\n", comparison.entity_coverage_pct));

    if !comparison.recommendations.is_empty() {
        out.push_str("\n### Recommendations\n\n");
        for rec in &comparison.recommendations {
            out.push_str(&format!("- **{}**: {}\n", rec.priority, escape(&rec.message)));
        }
    }

    if !comparison.missing_keywords.is_empty() {
        out.push_str("\n### Missing keywords\n\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_keywords, max_rows)
            .iter()
            .map(|k| vec![escape(&k.keyword), k.urls_count.to_string(), format!("{:.2}", k.importance)])
            .collect();
        out.push_str(&table(&["Keyword", "Pages", "Importance"], &rows));
    }

    if !comparison.keyword_gaps.is_empty() {
        out.push_str("\n### Under-used keywords\n\n");
        let rows: Vec<Vec<String>> = limit(&comparison.keyword_gaps, max_rows)
            .iter()
            .map(|g| {
                vec![
                    escape(&g.keyword),
                    g.user_occurrences.to_string(),
                    format!("{:.1}", g.corpus_avg_occurrences),
                    format!("{:.0}%", g.deficit_pct),
                ]
            })
            .collect();
        out.push_str(&table(&["Keyword", "Your page", "Corpus avg", "Deficit"], &rows));
    }

    if !comparison.missing_topics.is_empty() {
        out.push_str("\n### Missing topics\n\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_topics, max_rows)
            .iter()
            .map(|t| vec![escape(&t.topic), t.count.to_string()])
            .collect();
        out.push_str(&table(&["Topic", "Pages"], &rows));
    }

    if !comparison.missing_entities.is_empty() {
        out.push_str("\n### Missing entities\n\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_entities, max_rows)
            .iter()
            .map(|e| vec![escape(&e.entity_id), escape(&e.entity_type), e.total_count.to_string()])
            .collect();
        out.push_str(&table(&["Entity", "Type", "Mentions"], &rows));
    }
}

fn limit<T>(items: &[T], max_rows: usize) -> &[T] {
    if max_rows == 0 { items } else { &items[..items.len().min(max_rows)] }
}

/// Escape characters that would break a table cell
fn escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = String::new();
    table.push_str(&format!("| {} |\n", headers.join(" | ")));
    table.push_str(&format!("|{}\n", " --- |".repeat(headers.len())));
    for row in rows {
        table.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    table
}
