//! HTML parsing and visible-text extraction.
//!
//! This module provides the [`Document`] type that wraps a parsed HTML page
//! and turns it into the plain text fed to keyword extraction and
//! annotation. Script, style and page chrome (navigation, headers, footers,
//! forms) never contribute text.
//!
//! # Example
//!
//! ```rust
//! use serplens_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><title>Widgets</title><script>var x = 1;</script></head>
//!         <body><nav>Home</nav><article><p>Blue widgets ship fast.</p></article></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.title(), Some("Widgets".to_string()));
//! assert!(doc.main_text().contains("Blue widgets"));
//! assert!(!doc.main_text().contains("Home"));
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::{Result, SerpLensError};

/// Tags whose subtree never contributes text.
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "canvas", "iframe", "nav", "header", "footer", "aside",
    "form", "button", "select",
];

/// Tags rendered on their own line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "blockquote",
    "pre", "table", "tr", "td", "th", "br", "dd", "dt",
];

/// Selectors tried, in order, for the main content region.
const MAIN_REGION_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]"];

/// A main region shorter than this is ignored in favour of the whole body.
const MIN_MAIN_REGION_CHARS: usize = 200;

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// html5ever recovers from malformed markup, so this never fails on
    /// content; the `Result` is kept for selector errors surfaced by
    /// [`Document::select_text`].
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html) })
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed content of the `<title>` element if present and
    /// non-empty.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Returns the visible text of every element matching `selector`, one
    /// entry per element.
    ///
    /// # Errors
    ///
    /// Returns [`SerpLensError::ConfigError`] if the selector is invalid.
    pub fn select_text(&self, selector: &str) -> Result<Vec<String>> {
        let sel = Selector::parse(selector)
            .map_err(|e| SerpLensError::ConfigError(format!("Invalid selector {}: {}", selector, e)))?;

        Ok(self.html.select(&sel).map(visible_text).collect())
    }

    /// Visible text of the whole document.
    pub fn text_content(&self) -> String {
        visible_text(self.html.root_element())
    }

    /// Visible text of the main content region.
    ///
    /// Uses the first `<article>`, `<main>` or `role="main"` element holding
    /// a reasonable amount of text, and falls back to the whole document.
    pub fn main_text(&self) -> String {
        for selector in MAIN_REGION_SELECTORS {
            let Ok(sel) = Selector::parse(selector) else { continue };
            if let Some(region) = self.html.select(&sel).next() {
                let text = visible_text(region);
                if text.chars().count() >= MIN_MAIN_REGION_CHARS {
                    return text;
                }
            }
        }

        self.text_content()
    }
}

/// Collects the visible text under `element`, one line per block element,
/// whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }

            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_el, out);
            if block {
                out.push('\n');
            }
        }
    }
}

fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
