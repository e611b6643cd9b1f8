//! The engine: the pipeline's produced API surface.
//!
//! [`RagEngine`] composes the injected collaborators — document store,
//! parser, embedding provider, vector index, and optional generative
//! backend — behind three operations: [`index_document`](RagEngine::index_document),
//! [`remove_document`](RagEngine::remove_document), and
//! [`answer_query`](RagEngine::answer_query).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{RagConfig, RagEngine, InMemoryVectorIndex, PlainTextParser, QueryContext};
//!
//! let engine = RagEngine::builder()
//!     .config(RagConfig::default())
//!     .document_store(store)
//!     .parser(Arc::new(PlainTextParser))
//!     .embedding_provider(embedder.clone())
//!     .vector_index(Arc::new(InMemoryVectorIndex::new(embedder)))
//!     .build()?;
//!
//! engine.index_document("doc-1").await?;
//! let response = engine.answer_query(QueryContext::new("what changed?", 5)).await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::RagConfig;
use crate::document::{QueryContext, QueryResponse};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::indexer::Indexer;
use crate::parser::DocumentParser;
use crate::prompt::build_prompt;
use crate::retriever::retrieve;
use crate::storage::DocumentStore;
use crate::synthesize::{AnswerSynthesizer, GenerativeBackend};

/// The retrieval-augmented answering engine.
///
/// Construct one via [`RagEngine::builder()`]. Collaborators are injected
/// once at construction and shared by reference; the engine holds no other
/// state, so it is cheap to share behind an `Arc` across request handlers
/// and the background index worker.
pub struct RagEngine {
    indexer: Indexer,
    index: Arc<dyn VectorIndex>,
    synthesizer: AnswerSynthesizer,
    config: RagConfig,
}

impl RagEngine {
    /// Create a new [`RagEngineBuilder`].
    pub fn builder() -> RagEngineBuilder {
        RagEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Index one uploaded document into its own partition.
    ///
    /// Safe to call repeatedly: chunk IDs are deterministic, so a re-index
    /// re-upserts the same IDs (and repairs a partition left partial by an
    /// interrupted earlier run).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the document is not in the store,
    /// or a backend error if parsing, embedding, or upserting fails.
    pub async fn index_document(&self, document_id: &str) -> Result<()> {
        self.indexer.index_document(document_id).await
    }

    /// Remove a document: delete its partition and its stored file. A
    /// partition that never existed is success, not an error.
    pub async fn remove_document(&self, document_id: &str) -> Result<()> {
        self.indexer.remove_document(document_id).await
    }

    /// Answer a natural-language question over the indexed documents.
    ///
    /// Retrieval failures degrade to fewer (or no) sources and backend
    /// failures degrade to the deterministic fallback answer; neither
    /// surfaces as an error. Degraded quality is visible only through
    /// `backend_used == false` and/or empty citations.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] for programmer-error-class
    /// input: an empty query or `top_k < 1`. Nothing else errors.
    pub async fn answer_query(&self, context: QueryContext) -> Result<QueryResponse> {
        context.validate()?;
        let started = Instant::now();

        let retrieved = retrieve(
            &self.index,
            &context.query_text,
            context.top_k,
            context.partition_filter.as_deref(),
            self.config.backend_timeout,
        )
        .await;

        let prompt = build_prompt(&context.query_text, &retrieved, self.config.max_context_chars);
        let (structured_answer, backend_used) =
            self.synthesizer.synthesize(&prompt, &retrieved).await;

        let latency_s = started.elapsed().as_secs_f64();
        info!(
            backend_used,
            sources = retrieved.len(),
            citations = structured_answer.citations.len(),
            latency_s,
            "answered query"
        );

        Ok(QueryResponse {
            structured_answer,
            sources: retrieved,
            backend_used,
            latency_s,
            query: context.query_text,
        })
    }
}

/// Builder for constructing a [`RagEngine`].
///
/// The document store, parser, embedding provider, and vector index are
/// required; the generative backend and config are optional (the config
/// defaults, and without a backend every answer takes the deterministic
/// fallback path).
#[derive(Default)]
pub struct RagEngineBuilder {
    config: Option<RagConfig>,
    store: Option<Arc<dyn DocumentStore>>,
    parser: Option<Arc<dyn DocumentParser>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    backend: Option<Arc<dyn GenerativeBackend>>,
}

impl RagEngineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document store.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the document parser.
    pub fn parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector index gateway.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set an optional generative backend for answer synthesis.
    pub fn generative_backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the [`RagEngine`], validating that all required seams are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required collaborator is missing.
    pub fn build(self) -> Result<RagEngine> {
        let config = self.config.unwrap_or_default();
        let store = self
            .store
            .ok_or_else(|| RagError::Config("document_store is required".to_string()))?;
        let parser =
            self.parser.ok_or_else(|| RagError::Config("parser is required".to_string()))?;
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::Config("vector_index is required".to_string()))?;

        Ok(RagEngine {
            indexer: Indexer::new(store, parser, embedder, Arc::clone(&index), config.clone()),
            index,
            synthesizer: AnswerSynthesizer::new(self.backend, config.clone()),
            config,
        })
    }
}
