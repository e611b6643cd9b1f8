//! Data types for chunks, retrieval results, citations, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chunk and retrieval-result metadata: provenance fields (`file_id`,
/// `file_name`) plus zero or more locator fields used as citation anchors.
pub type Metadata = HashMap<String, Value>;

/// Locator metadata keys, probed in this order when building citation anchors.
pub const ANCHOR_KEYS: [&str; 5] = ["sheet", "row_index", "page", "table", "paragraph_index"];

/// An addressable unit of retrievable text.
///
/// Chunk IDs follow the pattern
/// `<document_id>::<locator-kind>=<locator-value>[::sub-index]` and are
/// deterministic for identical parser output, so re-indexing a document
/// re-upserts the same IDs instead of accumulating duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier within the chunk's partition.
    pub id: String,
    /// The text content; non-empty after trimming.
    pub text: String,
    /// Provenance and locator metadata.
    pub metadata: Metadata,
}

/// A single match returned by a vector index query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The matched chunk's ID.
    pub chunk_id: String,
    /// The partition (document) the chunk belongs to.
    pub partition: String,
    /// The matched chunk's text.
    pub text: String,
    /// The matched chunk's metadata.
    pub metadata: Metadata,
    /// Dissimilarity score; smaller is more relevant. `None` sorts last.
    pub distance: Option<f32>,
}

impl RetrievalResult {
    /// The distance used for relevance ordering; absent distance is treated
    /// as `+∞` (least relevant) rather than an error.
    pub fn sort_distance(&self) -> f32 {
        self.distance.unwrap_or(f32::INFINITY)
    }

    /// The `file_id` metadata field, falling back to the partition name.
    pub fn file_id(&self) -> String {
        self.metadata
            .get("file_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.partition.clone())
    }

    /// The `file_name` metadata field, falling back to [`file_id`](Self::file_id).
    pub fn file_name(&self) -> String {
        self.metadata
            .get("file_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.file_id())
    }
}

/// A reference from an answer back to a source location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Identifier of the cited document.
    pub file_id: String,
    /// Display name of the cited document.
    pub file_name: String,
    /// Comma-joined locator fields, e.g. `"sheet=Q1, row_index=15"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchors: Option<String>,
    /// The cited text, truncated to the configured maximum length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Relevance confidence in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// A validated answer with citations, the pipeline's terminal output shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredAnswer {
    /// The answer text.
    pub answer: String,
    /// Citations in relevance order; possibly empty.
    pub citations: Vec<Citation>,
}

/// Parameters for one answering request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryContext {
    /// The natural-language question.
    pub query_text: String,
    /// Maximum number of retrieval results to use; must be at least 1.
    pub top_k: usize,
    /// Restrict retrieval to these partitions; `None` searches all.
    pub partition_filter: Option<Vec<String>>,
}

impl QueryContext {
    /// Create a query context searching all partitions.
    pub fn new(query_text: impl Into<String>, top_k: usize) -> Self {
        Self { query_text: query_text.into(), top_k, partition_filter: None }
    }

    /// Restrict retrieval to the given partitions.
    pub fn with_partition_filter(mut self, partitions: Vec<String>) -> Self {
        self.partition_filter = Some(partitions);
        self
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        if self.query_text.trim().is_empty() {
            return Err(crate::error::RagError::InvalidArgument(
                "query_text must not be empty".to_string(),
            ));
        }
        if self.top_k < 1 {
            return Err(crate::error::RagError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The full response of [`answer_query`](crate::engine::RagEngine::answer_query).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The validated answer with citations.
    pub structured_answer: StructuredAnswer,
    /// The raw merged retrieval results the answer was built from.
    pub sources: Vec<RetrievalResult>,
    /// Whether the answer came from the generative backend. `false` means the
    /// deterministic fallback produced it (backend absent, failed, or its
    /// output did not survive the repair chain).
    pub backend_used: bool,
    /// Wall-clock seconds spent answering.
    pub latency_s: f64,
    /// The query text, echoed back for callers.
    pub query: String,
}

/// Build the comma-joined anchor list for a chunk's metadata, probing the
/// locator keys in [`ANCHOR_KEYS`] order. Empty when no locator is present.
pub fn anchor_list(metadata: &Metadata) -> String {
    let anchors: Vec<String> = ANCHOR_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key).map(|value| format!("{key}={}", plain_value(value))))
        .collect();
    anchors.join(", ")
}

/// Render a JSON value as plain text: strings without quotes, everything else
/// in its compact JSON form.
pub(crate) fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anchor_list_follows_probe_order() {
        let mut metadata = Metadata::new();
        metadata.insert("paragraph_index".to_string(), json!(4));
        metadata.insert("page".to_string(), json!(2));
        metadata.insert("file_name".to_string(), json!("report.pdf"));
        assert_eq!(anchor_list(&metadata), "page=2, paragraph_index=4");
    }

    #[test]
    fn anchor_list_empty_without_locators() {
        let mut metadata = Metadata::new();
        metadata.insert("file_id".to_string(), json!("doc-1"));
        assert_eq!(anchor_list(&metadata), "");
    }

    #[test]
    fn missing_distance_sorts_last() {
        let result = RetrievalResult {
            chunk_id: "c".to_string(),
            partition: "p".to_string(),
            text: "t".to_string(),
            metadata: Metadata::new(),
            distance: None,
        };
        assert_eq!(result.sort_distance(), f32::INFINITY);
    }

    #[test]
    fn query_context_rejects_bad_arguments() {
        assert!(QueryContext::new("", 5).validate().is_err());
        assert!(QueryContext::new("what changed?", 0).validate().is_err());
        assert!(QueryContext::new("what changed?", 1).validate().is_ok());
    }
}
