use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use serplens_core::{
    AnalyzerConfig, AnnotationMode, ComparisonConfig, CoverageMode, FetchConfig, FetcherConfig, HistoryKind,
    HistoryStore, JsonConfig, MarkdownConfig, PipelineConfig, SerpOutcome, SerpPipeline, SerpRequest, TextConfig,
    fetch_file, fetch_stdin, formatters,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    #[value(alias = "md")]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Coverage {
    /// Share of corpus topics/entities also on the page
    Intersection,
    /// Page item count over corpus item count
    SetRatio,
}

impl From<Coverage> for CoverageMode {
    fn from(value: Coverage) -> Self {
        match value {
            Coverage::Intersection => CoverageMode::Intersection,
            Coverage::SetRatio => CoverageMode::SetRatio,
        }
    }
}

/// Compare a page against the pages it competes with in search results
#[derive(Parser, Debug)]
#[command(name = "serplens")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Keep extracted page text in JSON output
    #[arg(long, global = true)]
    include_text: bool,

    /// Rows per table in text and Markdown output (0 = all)
    #[arg(long, global = true, default_value = "10", value_name = "NUM")]
    rows: usize,

    /// Language of the analyzed pages (stopword list)
    #[arg(short, long, global = true, default_value = "fr", value_name = "LANG")]
    language: String,

    /// Keywords extracted per page
    #[arg(long, global = true, default_value = "20", value_name = "NUM")]
    max_keywords: usize,

    /// TextRazor API key; topics and entities are skipped without it
    #[arg(long, global = true, env = "TEXTRAZOR_API_KEY", hide_env_values = true, value_name = "KEY")]
    textrazor_key: Option<String>,

    /// Let TextRazor fetch and clean each URL instead of sending local text
    #[arg(long, global = true)]
    annotate_url: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Append this run to a JSON history file
    #[arg(long, global = true, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the top search results for a keyword, optionally comparing your page
    Serp(SerpArgs),
    /// Analyze a single web page
    Page {
        /// URL of the page
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Analyze text from a file or stdin
    Text {
        /// Text file, or "-" for stdin
        #[arg(value_name = "INPUT", default_value = "-")]
        input: String,

        /// Label for the record (default: the input name)
        #[arg(long)]
        label: Option<String>,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug)]
struct SerpArgs {
    /// Search keyword
    #[arg(value_name = "KEYWORD")]
    keyword: String,

    /// Search location, e.g. "Paris,France"
    #[arg(long, default_value = "", value_name = "LOCATION")]
    location: String,

    /// Your page, compared against the results
    #[arg(long, value_name = "URL")]
    compare: Option<String>,

    /// ValueSERP API key
    #[arg(long, env = "VALUESERP_API_KEY", hide_env_values = true, value_name = "KEY")]
    valueserp_key: Option<String>,

    /// Search results requested (at most 30)
    #[arg(long, default_value = "10", value_name = "NUM")]
    results: usize,

    /// Result pages analyzed
    #[arg(long, default_value = "10", value_name = "NUM")]
    max_pages: usize,

    /// Pages analyzed in parallel
    #[arg(long, default_value = "5", value_name = "NUM")]
    concurrency: usize,

    /// Pause after each page, in milliseconds
    #[arg(long, default_value = "1000", value_name = "MS")]
    delay_ms: u64,

    /// Stop analyzing pages after this many seconds
    #[arg(long, value_name = "SECS")]
    batch_timeout: Option<u64>,

    /// Pages a keyword must appear on to count as missing
    #[arg(long, default_value = "3", value_name = "NUM")]
    min_pages: usize,

    /// Also report rarer keywords whose importance exceeds this
    #[arg(long, value_name = "SCORE")]
    importance_cutoff: Option<f64>,

    /// Coverage formula
    #[arg(long, value_enum, default_value = "intersection")]
    coverage: Coverage,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "serplens_core=debug,serplens=debug" } else { "serplens_core=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn pipeline_config(common: &CommonArgs, serp: Option<&SerpArgs>) -> PipelineConfig {
    let mut fetch = FetchConfig { timeout: common.timeout, ..Default::default() };
    if let Some(ua) = &common.user_agent {
        fetch.user_agent = ua.clone();
    }

    let analyzer = AnalyzerConfig::builder()
        .language(&common.language)
        .max_keywords(common.max_keywords)
        .annotation_mode(if common.annotate_url { AnnotationMode::Url } else { AnnotationMode::Text })
        .build();

    let mut builder = PipelineConfig::builder().fetch(fetch).analyzer(analyzer);

    if let Some(serp) = serp {
        let fetcher = FetcherConfig::builder()
            .max_concurrency(serp.concurrency)
            .pacing_delay(Duration::from_millis(serp.delay_ms))
            .max_pages(serp.max_pages)
            .build();

        let mut comparison = ComparisonConfig::builder().min_pages(serp.min_pages).coverage(serp.coverage.into());
        if let Some(cutoff) = serp.importance_cutoff {
            comparison = comparison.importance_cutoff(cutoff);
        }

        builder = builder.fetcher(fetcher).comparison(comparison.build()).search_results(serp.results);
        if let Some(secs) = serp.batch_timeout {
            builder = builder.batch_timeout(Duration::from_secs(secs));
        }
    }

    builder.build()
}

fn json_config(common: &CommonArgs) -> JsonConfig {
    JsonConfig { pretty: true, include_text: common.include_text }
}

fn render_outcome(outcome: &SerpOutcome, common: &CommonArgs) -> anyhow::Result<Option<String>> {
    let rendered = match (outcome, common.format) {
        (_, Format::Json) => Some(formatters::outcome_to_json(outcome, &json_config(common))?),
        (SerpOutcome::Report(report), Format::Text) => {
            Some(formatters::report_to_text(report, &TextConfig { max_rows: common.rows, include_pages: true }))
        }
        (SerpOutcome::Report(report), Format::Markdown) => {
            Some(formatters::report_to_markdown(report, &MarkdownConfig { max_rows: common.rows, ..Default::default() }))
        }
        (SerpOutcome::Empty { .. }, _) => None,
    };
    Ok(rendered)
}

fn render_record(record: &serplens_core::PageAnalysisRecord, common: &CommonArgs) -> anyhow::Result<String> {
    let rendered = match common.format {
        Format::Json => formatters::record_to_json(record, &json_config(common))?,
        Format::Text => formatters::record_to_text(record, &TextConfig { max_rows: common.rows, include_pages: false }),
        Format::Markdown => {
            formatters::record_to_markdown(record, &MarkdownConfig { max_rows: common.rows, ..Default::default() })
        }
    };
    Ok(rendered)
}

fn write_output(output: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn append_history(path: &Path, kind: HistoryKind, label: &str, summary: &str) -> anyhow::Result<()> {
    let mut history = if path.exists() {
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read history: {}", path.display()))?;
        HistoryStore::from_json(&json).with_context(|| format!("Invalid history file: {}", path.display()))?
    } else {
        HistoryStore::new()
    };

    history.record(kind, label, summary);
    fs::write(path, history.to_json()?).with_context(|| format!("Failed to write history: {}", path.display()))?;
    Ok(())
}

async fn run_serp(args: &SerpArgs, common: &CommonArgs) -> anyhow::Result<()> {
    let config = pipeline_config(common, Some(args));
    let pipeline =
        SerpPipeline::from_credentials(args.valueserp_key.as_deref(), common.textrazor_key.as_deref(), config)
            .context("Failed to set up the analysis pipeline")?;

    if !pipeline.has_search() {
        anyhow::bail!("Missing API credential for valueserp: pass --valueserp-key or set VALUESERP_API_KEY");
    }
    if common.textrazor_key.is_none() {
        echo::print_warning("No TextRazor key: topics and entities are disabled");
    }

    let mut request = SerpRequest::new(&args.keyword, &args.location).language(&common.language);
    if let Some(url) = &args.compare {
        request = request.user_url(url);
    }

    if common.verbose {
        echo::print_step(1, 2, &format!("Analyzing search results for \"{}\"", args.keyword));
        echo::print_detail("Pages", &args.max_pages.to_string());
        echo::print_detail("Concurrency", &args.concurrency.to_string());
        if let Some(url) = &args.compare {
            echo::print_detail("Compare", url);
        }
        eprintln!();
    }

    debug!(keyword = %args.keyword, location = %args.location, compare = ?args.compare, "starting SERP run");
    let started = Instant::now();
    let outcome = pipeline.run(&request).await.context("SERP analysis failed")?;

    if common.verbose {
        echo::print_timing("Analysis", started.elapsed());
        echo::print_step(2, 2, "Rendering report");
    }

    let summary = match &outcome {
        SerpOutcome::Report(report) => {
            if common.verbose {
                echo::print_report_summary(report);
            }
            if report.cancelled {
                echo::print_warning("Batch timeout reached; the report covers the pages finished in time");
            }
            if args.compare.is_some() && report.comparison.is_none() {
                echo::print_warning("Your page could not be analyzed; the report has no comparison");
            }
            format!("{} pages analyzed, {} failed", report.pages.len(), report.failed_pages)
        }
        SerpOutcome::Empty { reason, .. } => {
            echo::print_warning(&format!("No results for \"{}\": {}", args.keyword, reason));
            format!("no results: {}", reason)
        }
    };

    if let Some(rendered) = render_outcome(&outcome, common)? {
        write_output(&rendered, common.output.as_deref())?;
    }
    if let Some(path) = &common.history {
        append_history(path, HistoryKind::Serp, &args.keyword, &summary)?;
    }

    Ok(())
}

async fn run_page(url: &str, common: &CommonArgs) -> anyhow::Result<()> {
    let pipeline = SerpPipeline::from_credentials(None, common.textrazor_key.as_deref(), pipeline_config(common, None))
        .context("Failed to set up the analysis pipeline")?;

    if common.verbose {
        echo::print_step(1, 1, &format!("Analyzing {}", url.bright_white().underline()));
    }

    debug!(url, "analyzing single page");
    let record = pipeline.analyze_page(url).await.with_context(|| format!("Failed to analyze {}", url))?;

    if common.verbose {
        echo::print_record_summary(&record);
    }

    write_output(&render_record(&record, common)?, common.output.as_deref())?;
    if let Some(path) = &common.history {
        append_history(path, HistoryKind::Page, url, &format!("{} keywords", record.keywords.len()))?;
    }

    Ok(())
}

async fn run_text(input: &str, label: Option<&str>, common: &CommonArgs) -> anyhow::Result<()> {
    let pipeline = SerpPipeline::from_credentials(None, common.textrazor_key.as_deref(), pipeline_config(common, None))
        .context("Failed to set up the analysis pipeline")?;

    let text = if input == "-" {
        if common.verbose {
            echo::print_step(1, 2, "Reading from stdin");
        }
        fetch_stdin().context("Failed to read from stdin")?
    } else {
        if common.verbose {
            echo::print_step(1, 2, &format!("Reading from file {}", input.bright_white()));
        }
        fetch_file(input).with_context(|| format!("Failed to read file: {}", input))?
    };

    if common.verbose {
        echo::print_detail("Size", &echo::format_size(text.len()));
        eprintln!();
        echo::print_step(2, 2, "Analyzing text");
    }

    let label = label.unwrap_or(if input == "-" { "stdin" } else { input });
    let record = pipeline.analyze_text(label, &text).await.context("Failed to analyze text")?;

    if common.verbose {
        echo::print_record_summary(&record);
    }

    write_output(&render_record(&record, common)?, common.output.as_deref())?;
    if let Some(path) = &common.history {
        append_history(path, HistoryKind::Text, label, &format!("{} keywords", record.keywords.len()))?;
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Serp(args) => run_serp(args, &cli.common).await,
        Command::Page { url } => run_page(url, &cli.common).await,
        Command::Text { input, label } => run_text(input, label.as_deref(), &cli.common).await,
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "serplens", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    if cli.common.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(e) = run(cli).await {
        echo::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
