use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::model::{PageAnalysisRecord, SerpOutcome, SerpReport};

/// Configuration for JSON output
#[derive(Debug, Clone)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
    /// Keep the stored page text of every record
    pub include_text: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { pretty: true, include_text: false }
    }
}

/// Serialize `value`, dropping every `extracted_text` field unless text is requested
fn to_json<T: Serialize>(value: &T, config: &JsonConfig) -> Result<String> {
    let mut value = serde_json::to_value(value)?;
    if !config.include_text {
        strip_text(&mut value);
    }

    let json = if config.pretty { serde_json::to_string_pretty(&value)? } else { serde_json::to_string(&value)? };
    Ok(json)
}

fn strip_text(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("extracted_text");
            map.values_mut().for_each(strip_text);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_text),
        _ => {}
    }
}

pub fn report_to_json(report: &SerpReport, config: &JsonConfig) -> Result<String> {
    to_json(report, config)
}

/// Serialize a run outcome, tagged with `"outcome": "report" | "empty"`
pub fn outcome_to_json(outcome: &SerpOutcome, config: &JsonConfig) -> Result<String> {
    to_json(outcome, config)
}

pub fn record_to_json(record: &PageAnalysisRecord, config: &JsonConfig) -> Result<String> {
    to_json(record, config)
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, report: &SerpReport) -> Result<String> {
        report_to_json(report, &self.config)
    }

    pub fn outcome(&self, outcome: &SerpOutcome) -> Result<String> {
        outcome_to_json(outcome, &self.config)
    }

    pub fn record(&self, record: &PageAnalysisRecord) -> Result<String> {
        record_to_json(record, &self.config)
    }
}
