use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("serplens")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compare a page against the pages it competes with in search results")
        .subcommand_required(true)
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (text, markdown, json)")
                .global(true)
                .default_value("text")
                .value_parser(["text", "markdown", "md", "json"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--"include-text" "Keep extracted page text in JSON output").global(true))
        .arg(clap::arg!(--rows <NUM> "Rows per table in text and Markdown output (0 = all)").global(true))
        .arg(clap::arg!(-l --language <LANG> "Language of the analyzed pages (stopword list)").global(true))
        .arg(clap::arg!(--"max-keywords" <NUM> "Keywords extracted per page").global(true))
        .arg(clap::arg!(--"textrazor-key" <KEY> "TextRazor API key").global(true))
        .arg(clap::arg!(--"annotate-url" "Let TextRazor fetch and clean each URL").global(true))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").global(true))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").global(true))
        .arg(
            clap::arg!(--history <FILE> "Append this run to a JSON history file")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(
            clap::Command::new("serp")
                .about("Analyze the top search results for a keyword, optionally comparing your page")
                .arg(clap::arg!(<KEYWORD> "Search keyword"))
                .arg(clap::arg!(--location <LOCATION> "Search location"))
                .arg(clap::arg!(--compare <URL> "Your page, compared against the results"))
                .arg(clap::arg!(--"valueserp-key" <KEY> "ValueSERP API key"))
                .arg(clap::arg!(--results <NUM> "Search results requested (at most 30)"))
                .arg(clap::arg!(--"max-pages" <NUM> "Result pages analyzed"))
                .arg(clap::arg!(--concurrency <NUM> "Pages analyzed in parallel"))
                .arg(clap::arg!(--"delay-ms" <MS> "Pause after each page, in milliseconds"))
                .arg(clap::arg!(--"batch-timeout" <SECS> "Stop analyzing pages after this many seconds"))
                .arg(clap::arg!(--"min-pages" <NUM> "Pages a keyword must appear on to count as missing"))
                .arg(clap::arg!(--"importance-cutoff" <SCORE> "Also report rarer keywords above this importance"))
                .arg(
                    clap::arg!(--coverage <MODE> "Coverage formula")
                        .value_parser(["intersection", "set-ratio"]),
                ),
        )
        .subcommand(
            clap::Command::new("page")
                .about("Analyze a single web page")
                .arg(clap::arg!(<URL> "URL of the page")),
        )
        .subcommand(
            clap::Command::new("text")
                .about("Analyze text from a file or stdin")
                .arg(clap::arg!([INPUT] "Text file, or '-' for stdin").default_value("-"))
                .arg(clap::arg!(--label <LABEL> "Label for the record")),
        )
        .subcommand(
            clap::Command::new("completions")
                .about("Print a shell completion script")
                .arg(clap::arg!(<SHELL> "Shell").value_parser(["bash", "zsh", "fish", "powershell", "elvish"])),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "serplens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "serplens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "serplens", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "serplens", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
