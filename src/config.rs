//! Configuration for the answering pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Tunable parameters for the answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum words per chunk when word-splitting long text.
    pub max_words_per_chunk: usize,
    /// Number of chunk texts embedded per batch request.
    pub embed_batch_size: usize,
    /// Default number of retrieval results per query.
    pub top_k: usize,
    /// Character budget for the prompt's context section.
    pub max_context_chars: usize,
    /// Maximum citation snippet length, ellipsis included.
    pub snippet_max_chars: usize,
    /// Excerpt length used in fallback answer summaries.
    pub answer_excerpt_chars: usize,
    /// Maximum number of summary lines in a fallback answer.
    pub max_fallback_summaries: usize,
    /// Maximum number of citations in a fallback answer.
    pub max_fallback_citations: usize,
    /// Deadline applied to every external backend call.
    pub backend_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_words_per_chunk: 250,
            embed_batch_size: 128,
            top_k: 5,
            max_context_chars: 4000,
            snippet_max_chars: 200,
            answer_excerpt_chars: 150,
            max_fallback_summaries: 3,
            max_fallback_citations: 5,
            backend_timeout: Duration::from_secs(30),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum words per chunk.
    pub fn max_words_per_chunk(mut self, words: usize) -> Self {
        self.config.max_words_per_chunk = words;
        self
    }

    /// Set the embedding batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the default number of retrieval results per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the character budget for the prompt's context section.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the maximum citation snippet length.
    pub fn snippet_max_chars(mut self, chars: usize) -> Self {
        self.config.snippet_max_chars = chars;
        self
    }

    /// Set the excerpt length for fallback answer summaries.
    pub fn answer_excerpt_chars(mut self, chars: usize) -> Self {
        self.config.answer_excerpt_chars = chars;
        self
    }

    /// Set the maximum number of summary lines in a fallback answer.
    pub fn max_fallback_summaries(mut self, count: usize) -> Self {
        self.config.max_fallback_summaries = count;
        self
    }

    /// Set the maximum number of citations in a fallback answer.
    pub fn max_fallback_citations(mut self, count: usize) -> Self {
        self.config.max_fallback_citations = count;
        self
    }

    /// Set the deadline applied to every external backend call.
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.config.backend_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any count or budget is zero, or the
    /// backend timeout is zero.
    pub fn build(self) -> Result<RagConfig> {
        let c = &self.config;
        if c.max_words_per_chunk == 0 {
            return Err(RagError::Config("max_words_per_chunk must be greater than zero".into()));
        }
        if c.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".into()));
        }
        if c.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".into()));
        }
        if c.max_context_chars == 0 {
            return Err(RagError::Config("max_context_chars must be greater than zero".into()));
        }
        if c.snippet_max_chars == 0 {
            return Err(RagError::Config("snippet_max_chars must be greater than zero".into()));
        }
        if c.backend_timeout.is_zero() {
            return Err(RagError::Config("backend_timeout must be non-zero".into()));
        }
        Ok(self.config)
    }
}
