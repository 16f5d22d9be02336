use std::time::Duration;

use owo_colors::OwoColorize;
use serplens_core::{PageAnalysisRecord, SerpReport};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "serplens".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Keyword, topic and entity gap analysis against search results\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print a labelled value, indented under the current step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print elapsed time, colored by how long the step took
pub fn print_timing(label: &str, duration: Duration) {
    let secs = duration.as_secs_f64();
    let label = format!("{}:", label);

    if secs < 5.0 {
        eprintln!("  {} {:>7.2}s", label.dimmed(), secs.green());
    } else if secs < 30.0 {
        eprintln!("  {} {:>7.2}s", label.dimmed(), secs.bright_yellow());
    } else {
        eprintln!("  {} {:>7.2}s", label.dimmed(), secs.bright_red());
    }
}

/// Print the headline numbers of a SERP run
pub fn print_report_summary(report: &SerpReport) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "SERP Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_detail("Results", &report.result_urls.len().to_string());
    print_detail("Analyzed", &report.pages.len().to_string());
    print_detail("Failed", &report.failed_pages.to_string());
    print_detail("Corpus keywords", &report.corpus.keyword_stats.len().to_string());
    if let Some(comparison) = &report.comparison {
        print_detail("Topic coverage", &format!("{:.1}%", comparison.topic_coverage_pct));
        print_detail("Recommendations", &comparison.recommendations.len().to_string());
    }
    eprintln!();
}

/// Print the headline numbers of a single-page analysis
pub fn print_record_summary(record: &PageAnalysisRecord) {
    print_detail("Words", &record.word_count.to_string());
    print_detail("Keywords", &record.keywords.len().to_string());
    print_detail("Topics", &record.topics.len().to_string());
    print_detail("Entities", &record.entities.len().to_string());
    eprintln!();
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
