use crate::model::{ComparisonResult, CorpusStatistics, PageAnalysisRecord, SerpReport};

/// Configuration for plain text output
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Rows shown per table (0 = all)
    pub max_rows: usize,
    /// List every analyzed page with its keyword count
    pub include_pages: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { max_rows: 10, include_pages: true }
    }
}

/// Plain text formatter for reports and single-page analyses
pub struct TextFormatter {
    config: TextConfig,
}

impl TextFormatter {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, report: &SerpReport) -> String {
        report_to_text(report, &self.config)
    }

    pub fn record(&self, record: &PageAnalysisRecord) -> String {
        record_to_text(record, &self.config)
    }
}

/// Render a SERP report as aligned plain text
pub fn report_to_text(report: &SerpReport, config: &TextConfig) -> String {
    let mut out = String::new();

    let title = if report.location.is_empty() {
        format!("SERP analysis: \"{}\"", report.query)
    } else {
        format!("SERP analysis: \"{}\" ({})", report.query, report.location)
    };
    push_heading(&mut out, &title, '=');

    out.push_str(&format!(
        "Pages analyzed: {} of {} results ({} failed)\n",
        report.pages.len(),
        report.result_urls.len(),
        report.failed_pages
    ));
    if report.cancelled {
        out.push_str("Batch stopped at the time limit; statistics cover the pages finished before it.\n");
    }
    if !report.corpus.skipped.is_empty() {
        out.push_str(&format!("Excluded from statistics: {}\n", report.corpus.skipped.len()));
    }

    if config.include_pages && !report.pages.is_empty() {
        out.push('\n');
        push_heading(&mut out, "Pages", '-');
        let rows: Vec<Vec<String>> = report
            .pages
            .iter()
            .map(|p| vec![p.url.clone(), p.word_count.to_string(), p.keywords.len().to_string()])
            .collect();
        push_table(&mut out, &["URL", "Words", "Keywords"], &rows);
    }

    push_corpus(&mut out, &report.corpus, config);

    if let Some(comparison) = &report.comparison {
        let target = report.user_page.as_ref().map(|p| p.url.as_str()).unwrap_or("your page");
        push_comparison(&mut out, target, comparison, config);
    }

    out.trim_end().to_string()
}

/// Render one page analysis as aligned plain text
pub fn record_to_text(record: &PageAnalysisRecord, config: &TextConfig) -> String {
    let mut out = String::new();
    push_heading(&mut out, &record.url, '=');
    out.push_str(&format!("Words: {}\n", record.word_count));
    out.push_str(&format!("Annotation: {}\n", annotation_label(record)));

    if !record.keywords.is_empty() {
        out.push('\n');
        push_heading(&mut out, "Keywords", '-');
        let rows: Vec<Vec<String>> = limit(&record.keywords, config.max_rows)
            .iter()
            .map(|k| {
                vec![
                    k.keyword.clone(),
                    format!("{:.4}", k.score),
                    k.occurrences.to_string(),
                    format!("{:.1}", k.density_per_1000_words),
                ]
            })
            .collect();
        push_table(&mut out, &["Keyword", "Score", "Count", "Per 1000"], &rows);
    }

    if !record.topics.is_empty() {
        out.push('\n');
        push_heading(&mut out, "Topics", '-');
        let rows: Vec<Vec<String>> = limit(&record.topics, config.max_rows)
            .iter()
            .map(|t| vec![t.topic.clone(), format!("{:.2}", t.score)])
            .collect();
        push_table(&mut out, &["Topic", "Score"], &rows);
    }

    if !record.entities.is_empty() {
        out.push('\n');
        push_heading(&mut out, "Entities", '-');
        let rows: Vec<Vec<String>> = limit(&record.entities, config.max_rows)
            .iter()
            .map(|e| {
                vec![e.entity_id.clone(), e.entity_type.clone(), format!("{:.2}", e.relevance), e.occurrence_count.to_string()]
            })
            .collect();
        push_table(&mut out, &["Entity", "Type", "Relevance", "Mentions"], &rows);
    }

    out.trim_end().to_string()
}

pub(crate) fn annotation_label(record: &PageAnalysisRecord) -> String {
    use crate::model::AnnotationStatus;

    match &record.annotation {
        AnnotationStatus::Complete => "complete".to_string(),
        AnnotationStatus::Skipped => "skipped (no credential)".to_string(),
        AnnotationStatus::Failed { reason } => format!("failed ({})", reason),
    }
}

fn push_corpus(out: &mut String, corpus: &CorpusStatistics, config: &TextConfig) {
    let mut keywords: Vec<_> = corpus.keyword_stats.iter().collect();
    keywords.sort_by(|a, b| b.1.urls_count.cmp(&a.1.urls_count).then_with(|| a.1.avg_score.total_cmp(&b.1.avg_score)));

    if !keywords.is_empty() {
        out.push('\n');
        push_heading(out, "Corpus keywords", '-');
        let rows: Vec<Vec<String>> = limit(&keywords, config.max_rows)
            .iter()
            .map(|(k, s)| {
                vec![
                    k.to_string(),
                    s.urls_count.to_string(),
                    s.total_occurrences.to_string(),
                    format!("{:.1}", s.avg_occurrences),
                    format!("{:.4}", s.avg_score),
                ]
            })
            .collect();
        push_table(out, &["Keyword", "Pages", "Total", "Avg/page", "Avg score"], &rows);
    }

    let mut topics: Vec<_> = corpus.topic_stats.iter().collect();
    topics.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

    if !topics.is_empty() {
        out.push('\n');
        push_heading(out, "Corpus topics", '-');
        let rows: Vec<Vec<String>> = limit(&topics, config.max_rows)
            .iter()
            .map(|(t, s)| vec![t.to_string(), s.count.to_string(), format!("{:.2}", s.avg_score)])
            .collect();
        push_table(out, &["Topic", "Pages", "Avg score"], &rows);
    }

    let mut entities: Vec<_> = corpus.entity_stats.iter().collect();
    entities.sort_by(|a, b| b.1.total_count.cmp(&a.1.total_count).then_with(|| a.0.cmp(b.0)));

    if !entities.is_empty() {
        out.push('\n');
        push_heading(out, "Corpus entities", '-');
        let rows: Vec<Vec<String>> = limit(&entities, config.max_rows)
            .iter()
            .map(|(id, s)| vec![id.to_string(), s.entity_type.clone(), s.total_count.to_string(), s.urls_count.to_string()])
            .collect();
        push_table(out, &["Entity", "Type", "Mentions", "Pages"], &rows);
    }
}

fn push_comparison(out: &mut String, target: &str, comparison: &ComparisonResult, config: &TextConfig) {
    out.push('\n');
    push_heading(out, &format!("Comparison with {}", target), '-');
    out.push_str(&format!("Topic coverage:  {:.1}%\n", comparison.topic_coverage_pct));
    out.push_str(&format!("Entity coverage: {:.1}%\n", comparison.entity_coverage_pct));

    if !comparison.missing_keywords.is_empty() {
        out.push_str("\nMissing keywords\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_keywords, config.max_rows)
            .iter()
            .map(|k| vec![k.keyword.clone(), k.urls_count.to_string(), format!("{:.2}", k.importance)])
            .collect();
        push_table(out, &["Keyword", "Pages", "Importance"], &rows);
    }

    if !comparison.keyword_gaps.is_empty() {
        out.push_str("\nUnder-used keywords\n");
        let rows: Vec<Vec<String>> = limit(&comparison.keyword_gaps, config.max_rows)
            .iter()
            .map(|g| {
                vec![
                    g.keyword.clone(),
                    g.user_occurrences.to_string(),
                    format!("{:.1}", g.corpus_avg_occurrences),
                    format!("{:.0}%", g.deficit_pct),
                ]
            })
            .collect();
        push_table(out, &["Keyword", "Yours", "Corpus avg", "Deficit"], &rows);
    }

    if !comparison.missing_topics.is_empty() {
        out.push_str("\nMissing topics\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_topics, config.max_rows)
            .iter()
            .map(|t| vec![t.topic.clone(), t.count.to_string()])
            .collect();
        push_table(out, &["Topic", "Pages"], &rows);
    }

    if !comparison.missing_entities.is_empty() {
        out.push_str("\nMissing entities\n");
        let rows: Vec<Vec<String>> = limit(&comparison.missing_entities, config.max_rows)
            .iter()
            .map(|e| vec![e.entity_id.clone(), e.entity_type.clone(), e.total_count.to_string()])
            .collect();
        push_table(out, &["Entity", "Type", "Mentions"], &rows);
    }

    if !comparison.recommendations.is_empty() {
        out.push('\n');
        push_heading(out, "Recommendations", '-');
        for rec in &comparison.recommendations {
            out.push_str(&format!("[{}] {}\n", rec.priority, rec.message));
        }
    }
}

fn limit<T>(items: &[T], max_rows: usize) -> &[T] {
    if max_rows == 0 { items } else { &items[..items.len().min(max_rows)] }
}

fn push_heading(out: &mut String, title: &str, underline: char) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&underline.to_string().repeat(title.chars().count()));
    out.push('\n');
}

/// Left-aligned columns padded to the widest cell
fn push_table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        let padded: Vec<String> =
            cells.iter().zip(&widths).map(|(cell, width)| format!("{:<width$}", cell, width = width)).collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    out.push_str(&render(headers.to_vec()));
    for row in rows {
        out.push_str(&render(row.iter().map(String::as_str).collect()));
    }
}
