//! Data types for documents, search filters, and search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied metadata stored next to a document's text.
pub type Metadata = serde_json::Map<String, Value>;

/// Payload field holding the document text.
pub const TEXT_FIELD: &str = "text";

/// Payload field holding the caller's key when it is not a native point id.
pub const KEY_FIELD: &str = "key";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Metadata::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A value a payload field must equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchValue {
    Keyword(String),
    Integer(i64),
    Bool(bool),
}

impl MatchValue {
    /// Whether a stored JSON value equals this match value.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Keyword(expected), Value::String(actual)) => expected == actual,
            (Self::Integer(expected), Value::Number(actual)) => actual.as_i64() == Some(*expected),
            (Self::Bool(expected), Value::Bool(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl From<&str> for MatchValue {
    fn from(value: &str) -> Self {
        Self::Keyword(value.to_string())
    }
}

impl From<String> for MatchValue {
    fn from(value: String) -> Self {
        Self::Keyword(value)
    }
}

impl From<i64> for MatchValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MatchValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An exact-match condition on one payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: String,
    pub value: MatchValue,
}

/// Conditions a search result's payload must satisfy. All conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub must: Vec<FieldMatch>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn must_match(mut self, field: impl Into<String>, value: impl Into<MatchValue>) -> Self {
        self.must.push(FieldMatch { field: field.into(), value: value.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Whether `payload` satisfies every condition.
    pub fn matches(&self, payload: &Metadata) -> bool {
        self.must.iter().all(|condition| {
            payload.get(&condition.field).is_some_and(|value| condition.value.matches(value))
        })
    }
}

/// Per-call overrides for [`Knowledgebase::search_with`](crate::Knowledgebase::search_with).
///
/// Unset fields fall back to the knowledgebase configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub filters: Option<SearchFilters>,
    pub score_threshold: Option<f32>,
    pub limit: Option<usize>,
}

impl SearchOptions {
    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored entry returned by a search, paired with its similarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The key the entry was added under.
    pub key: String,
    /// The stored payload serialized as JSON text.
    pub value: String,
    /// The stored payload: `text` plus the caller's metadata.
    pub payload: Metadata,
    /// Similarity score reported by the store.
    pub similarity: f32,
}

impl SearchResult {
    /// The stored document text, if the payload has one.
    pub fn text(&self) -> Option<&str> {
        self.payload.get(TEXT_FIELD).and_then(Value::as_str)
    }
}
