//! Semantic annotation (topics and entities).
//!
//! [`SemanticAnnotator`] is the seam the analyzer calls; [`TextRazorClient`]
//! is the bundled implementation over the TextRazor REST API. The client
//! owns its credential, so "no credential" is expressed by not building a
//! client at all (see [`TextRazorClient::from_credential`]).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{EntityMention, TopicScore};
use crate::{Result, SerpLensError};

const TEXTRAZOR_ENDPOINT: &str = "https://api.textrazor.com/";

/// What to annotate.
#[derive(Debug, Clone, Copy)]
pub enum AnnotationInput<'a> {
    Text(&'a str),
    /// Let the service fetch and clean the page itself.
    Url(&'a str),
}

/// Topics and entities for one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Text as cleaned by the service, when it fetched a URL.
    pub cleaned_text: Option<String>,
    pub topics: Vec<TopicScore>,
    pub entities: Vec<EntityMention>,
}

#[async_trait]
pub trait SemanticAnnotator: Send + Sync {
    async fn annotate(&self, input: AnnotationInput<'_>) -> Result<Annotation>;
}

#[derive(Debug, Deserialize)]
struct TextRazorEnvelope {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Option<TextRazorResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextRazorResponse {
    #[serde(default)]
    cleaned_text: Option<String>,
    #[serde(default)]
    topics: Vec<TextRazorTopic>,
    #[serde(default)]
    entities: Vec<TextRazorEntity>,
}

#[derive(Debug, Deserialize)]
struct TextRazorTopic {
    label: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextRazorEntity {
    #[serde(default)]
    entity_id: Option<String>,
    #[serde(default)]
    matched_text: Option<String>,
    #[serde(default, rename = "type")]
    types: Vec<String>,
    #[serde(default)]
    freebase_types: Vec<String>,
    #[serde(default)]
    relevance_score: f64,
    #[serde(default)]
    confidence_score: f64,
}

/// TextRazor REST client.
pub struct TextRazorClient {
    api_key: String,
    client: Client,
    timeout: u64,
}

impl TextRazorClient {
    pub fn new(api_key: &str, timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(SerpLensError::HttpError)?;
        Ok(Self { api_key: api_key.to_string(), client, timeout })
    }

    /// Builds a client when a non-blank credential is present.
    pub fn from_credential(api_key: Option<&str>, timeout: u64) -> Result<Option<Self>> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Ok(Some(Self::new(key, timeout)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SemanticAnnotator for TextRazorClient {
    async fn annotate(&self, input: AnnotationInput<'_>) -> Result<Annotation> {
        let mut form = vec![("extractors", "entities,topics"), ("cleanup.returnCleaned", "true")];
        match input {
            AnnotationInput::Text(text) => form.push(("text", text)),
            AnnotationInput::Url(url) => form.push(("url", url)),
        }

        let response = self
            .client
            .post(TEXTRAZOR_ENDPOINT)
            .header("x-textrazor-key", &self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SerpLensError::AnnotationFailure(format!("timed out after {} seconds", self.timeout))
                } else {
                    SerpLensError::AnnotationFailure(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SerpLensError::AnnotationFailure(e.to_string()))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<TextRazorEnvelope>(&body).ok().and_then(|e| e.error);
            return Err(SerpLensError::AnnotationFailure(format!(
                "HTTP {}{}",
                status,
                detail.map(|d| format!(": {}", d)).unwrap_or_default()
            )));
        }

        let annotation = parse_textrazor_response(&body)?;
        debug!(topics = annotation.topics.len(), entities = annotation.entities.len(), "annotation complete");
        Ok(annotation)
    }
}

/// Parses a TextRazor response body.
///
/// Entity mentions are grouped by entity id: the occurrence count is the
/// number of mentions, relevance and confidence the best seen, and the type
/// the first DBpedia type (then Freebase type, then "Unknown").
pub(crate) fn parse_textrazor_response(body: &str) -> Result<Annotation> {
    let envelope: TextRazorEnvelope =
        serde_json::from_str(body).map_err(|e| SerpLensError::AnnotationFailure(format!("bad response: {}", e)))?;

    if envelope.ok == Some(false) {
        return Err(SerpLensError::AnnotationFailure(
            envelope.error.unwrap_or_else(|| "service reported failure".to_string()),
        ));
    }

    let response = envelope.response.unwrap_or_default();

    let topics = response
        .topics
        .into_iter()
        .filter(|t| !t.label.trim().is_empty())
        .map(|t| TopicScore { topic: t.label, score: t.score })
        .collect();

    let mut grouped: BTreeMap<String, EntityMention> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for entity in response.entities {
        let Some(id) = entity.entity_id.or(entity.matched_text).filter(|id| !id.trim().is_empty()) else {
            continue;
        };
        let entity_type = entity
            .types
            .into_iter()
            .next()
            .or_else(|| entity.freebase_types.into_iter().next())
            .unwrap_or_else(|| "Unknown".to_string());

        match grouped.get_mut(&id) {
            Some(existing) => {
                existing.occurrence_count += 1;
                existing.relevance = existing.relevance.max(entity.relevance_score);
                existing.confidence = existing.confidence.max(entity.confidence_score);
            }
            None => {
                order.push(id.clone());
                grouped.insert(
                    id.clone(),
                    EntityMention {
                        entity_id: id,
                        entity_type,
                        relevance: entity.relevance_score,
                        confidence: entity.confidence_score,
                        occurrence_count: 1,
                    },
                );
            }
        }
    }

    let entities = order.into_iter().filter_map(|id| grouped.remove(&id)).collect();

    Ok(Annotation { cleaned_text: response.cleaned_text.filter(|t| !t.is_empty()), topics, entities })
}
