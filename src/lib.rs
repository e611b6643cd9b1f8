//! # docrag
//!
//! A retrieval-augmented answering pipeline over heterogeneous documents,
//! with citations back to source locations.
//!
//! ## Overview
//!
//! Uploaded documents (tabular files, PDFs, free text) are parsed by external
//! format-specific parsers, normalized into addressable chunks with stable
//! IDs, and indexed into per-document partitions of a vector index. A query
//! fans out across partitions, merges results by relevance, assembles a
//! character-budgeted prompt, and converts the (possibly malformed) response
//! of an optional generative backend into a validated answer with citations —
//! falling back to deterministic synthesis whenever the backend is absent,
//! fails, or returns output that cannot be repaired.
//!
//! The concrete embedding model, vector index, document storage, and
//! generative model are external collaborators injected behind traits:
//! [`EmbeddingProvider`], [`VectorIndex`], [`DocumentStore`],
//! [`DocumentParser`], and [`GenerativeBackend`]. The crate ships
//! [`InMemoryVectorIndex`] as a reference index for development and tests.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{InMemoryVectorIndex, PlainTextParser, QueryContext, RagConfig, RagEngine};
//!
//! let engine = Arc::new(
//!     RagEngine::builder()
//!         .config(RagConfig::default())
//!         .document_store(store)
//!         .parser(Arc::new(PlainTextParser))
//!         .embedding_provider(embedder.clone())
//!         .vector_index(Arc::new(InMemoryVectorIndex::new(embedder)))
//!         .generative_backend(backend) // optional
//!         .build()?,
//! );
//!
//! engine.index_document("doc-1").await?;
//! let response = engine
//!     .answer_query(QueryContext::new("who scored the most goals?", 5))
//!     .await?;
//! println!("{}", response.structured_answer.answer);
//! ```
//!
//! ## Guarantees
//!
//! - Chunk IDs are deterministic for identical parser output, so re-indexing
//!   is idempotent.
//! - Retrieval never fails the caller: missing partitions are empty, failing
//!   partitions are skipped.
//! - [`RagEngine::answer_query`] errors only for invalid arguments; every
//!   backend failure degrades to the deterministic fallback answer, visible
//!   as `backend_used == false`.

pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexer;
pub mod memory;
pub mod normalize;
pub mod parser;
pub mod prompt;
pub mod repair;
pub mod retriever;
pub mod storage;
pub mod synthesize;
pub mod worker;

mod deadline;

pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Chunk, Citation, Metadata, QueryContext, QueryResponse, RetrievalResult, StructuredAnswer,
    anchor_list,
};
pub use embedding::EmbeddingProvider;
pub use engine::{RagEngine, RagEngineBuilder};
pub use error::{RagError, Result};
pub use index::VectorIndex;
pub use indexer::Indexer;
pub use memory::InMemoryVectorIndex;
pub use normalize::{ParsedContent, normalize};
pub use parser::{DocumentParser, PlainTextParser};
pub use prompt::{RESPONSE_INSTRUCTION, build_prompt, render_context};
pub use repair::parse_model_output;
pub use retriever::{merge_results, retrieve};
pub use storage::{DocumentKind, DocumentStore, StoredDocument};
pub use synthesize::{AnswerSynthesizer, GenerativeBackend, NO_RELEVANT_DATA, fallback_confidence};
pub use worker::IndexWorker;
