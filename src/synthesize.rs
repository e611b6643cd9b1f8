//! Answer synthesis: generative backend invocation, validation, and the
//! deterministic fallback.
//!
//! The synthesizer is a small state machine: NoBackend goes straight to
//! Fallback; Invoke calls the backend once (failures are never retried here —
//! retry policy belongs to the backend's own resilience); Parse runs the
//! repair chain; Validate checks the decoded shape; any failure along the way
//! lands in Fallback, which synthesizes an answer and citations directly from
//! the retrieval results and always succeeds.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::deadline::bounded;
use crate::document::{Citation, RetrievalResult, StructuredAnswer, anchor_list};
use crate::error::Result;
use crate::repair::parse_model_output;

/// Fixed answer used when retrieval found nothing at all.
pub const NO_RELEVANT_DATA: &str = "No relevant data found to answer the question.";

/// A generative text backend: prompt in, free-form text out.
///
/// The pipeline functions fully without one; its output is trusted only
/// after surviving the repair chain and validation.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate a text response for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Converts retrieval results and an optional backend response into a
/// validated [`StructuredAnswer`]. Never fails the caller.
pub struct AnswerSynthesizer {
    backend: Option<Arc<dyn GenerativeBackend>>,
    config: RagConfig,
}

impl AnswerSynthesizer {
    /// Create a synthesizer. With `backend` absent, every call takes the
    /// deterministic fallback path.
    pub fn new(backend: Option<Arc<dyn GenerativeBackend>>, config: RagConfig) -> Self {
        Self { backend, config }
    }

    /// Produce the final answer for an assembled prompt.
    ///
    /// Returns the answer and whether it came from the generative backend.
    /// `false` covers backend absence, backend failure, and output that did
    /// not survive parse or validation.
    pub async fn synthesize(
        &self,
        prompt: &str,
        retrieved: &[RetrievalResult],
    ) -> (StructuredAnswer, bool) {
        if let Some(backend) = &self.backend {
            match bounded("generation", self.config.backend_timeout, backend.generate(prompt)).await
            {
                Ok(raw) => match self.validate(parse_model_output(&raw)) {
                    Some(answer) => return (answer, true),
                    None => {
                        warn!("model output failed the repair chain, using deterministic fallback");
                    }
                },
                Err(err) => {
                    warn!(error = %err, "generative backend failed, using deterministic fallback");
                }
            }
        } else {
            debug!("no generative backend configured, using deterministic fallback");
        }
        (self.fallback(retrieved), false)
    }

    /// Validate a decoded response: a string `answer` and an array
    /// `citations` are required; citation entries are coerced leniently and
    /// non-object entries dropped.
    fn validate(&self, decoded: Option<Value>) -> Option<StructuredAnswer> {
        let decoded = decoded?;
        let object = decoded.as_object()?;
        let answer = object.get("answer")?.as_str()?.to_string();
        let citations = object
            .get("citations")?
            .as_array()?
            .iter()
            .filter_map(|entry| self.coerce_citation(entry))
            .collect();
        Some(StructuredAnswer { answer, citations })
    }

    /// Coerce one backend-supplied citation object: missing strings are
    /// defaulted, confidence is clamped into `[0, 1]`, and the snippet is
    /// truncated to the configured maximum.
    fn coerce_citation(&self, entry: &Value) -> Option<Citation> {
        let object = entry.as_object()?;
        let file_id = object
            .get("file_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let file_name = object
            .get("file_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| file_id.clone());
        let anchors = object.get("anchors").and_then(Value::as_str).map(str::to_string);
        let snippet = object
            .get("snippet")
            .and_then(Value::as_str)
            .map(|snippet| truncate_snippet(snippet, self.config.snippet_max_chars));
        let confidence = object
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|confidence| confidence.clamp(0.0, 1.0) as f32);
        Some(Citation { file_id, file_name, anchors, snippet, confidence })
    }

    /// Deterministic synthesis straight from retrieval results: short
    /// per-source summaries for the answer, the top results as citations.
    fn fallback(&self, retrieved: &[RetrievalResult]) -> StructuredAnswer {
        if retrieved.is_empty() {
            return StructuredAnswer { answer: NO_RELEVANT_DATA.to_string(), citations: Vec::new() };
        }

        let summaries: Vec<String> = retrieved
            .iter()
            .take(self.config.max_fallback_summaries)
            .map(|result| {
                let excerpt: String =
                    result.text.chars().take(self.config.answer_excerpt_chars).collect();
                format!("According to {}: {excerpt}...", result.file_name())
            })
            .collect();

        let citations: Vec<Citation> = retrieved
            .iter()
            .take(self.config.max_fallback_citations)
            .map(|result| Citation {
                file_id: result.file_id(),
                file_name: result.file_name(),
                anchors: Some(anchor_list(&result.metadata)).filter(|anchors| !anchors.is_empty()),
                snippet: Some(truncate_snippet(&result.text, self.config.snippet_max_chars)),
                confidence: Some(fallback_confidence(result.distance)),
            })
            .collect();

        StructuredAnswer {
            answer: format!("Based on the retrieved documents:\n\n{}", summaries.join("\n\n")),
            citations,
        }
    }
}

/// Map a distance to a fallback confidence: `1 - distance/2`, clamped into
/// `[0, 1]`, defaulting to `0.5` when the distance is unknown.
///
/// This is a rough monotonic transform, not a calibrated probability; any
/// distance beyond 2.0 clamps to zero.
pub fn fallback_confidence(distance: Option<f32>) -> f32 {
    match distance {
        Some(distance) => (1.0 - distance / 2.0).clamp(0.0, 1.0),
        None => 0.5,
    }
}

/// Truncate a snippet to at most `max_chars` characters, ellipsis included.
pub(crate) fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
