//! Append-only log of analyses run in a session.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Result, SerpLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Serp,
    Page,
    Text,
}

impl std::fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryKind::Serp => write!(f, "serp"),
            HistoryKind::Page => write!(f, "page"),
            HistoryKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    /// Query, URL or text label.
    pub label: String,
    pub summary: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// In-memory history, passed explicitly to whoever records or reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry stamped with the current UTC time.
    pub fn record(&mut self, kind: HistoryKind, label: &str, summary: &str) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            kind,
            label: label.to_string(),
            summary: summary.to_string(),
            recorded_at: OffsetDateTime::now_utc(),
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(SerpLensError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(SerpLensError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_in_order() {
        let mut history = HistoryStore::new();
        assert!(history.latest().is_none());

        history.record(HistoryKind::Text, "draft", "12 keywords");
        history.record(HistoryKind::Serp, "widgets", "6 pages");

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].label, "draft");
        assert_eq!(history.latest().map(|e| e.kind), Some(HistoryKind::Serp));
        assert!(history.entries()[0].recorded_at <= history.entries()[1].recorded_at);
    }

    #[test]
    fn test_json_uses_rfc3339_timestamps() {
        let mut history = HistoryStore::new();
        history.record(HistoryKind::Page, "https://example.com", "20 keywords");

        let json = history.to_json().unwrap();
        assert!(json.contains(r#""kind": "page""#));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let stamp = value["entries"][0]["recorded_at"].as_str().unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(stamp.contains('T'));

        assert_eq!(HistoryStore::from_json(&json).unwrap(), history);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(HistoryStore::from_json("[1, 2"), Err(SerpLensError::SerializationError(_))));
    }
}
