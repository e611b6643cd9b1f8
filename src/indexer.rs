//! Indexing orchestrator: resolve → parse → normalize → embed → upsert.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::deadline::bounded;
use crate::document::{Chunk, Metadata};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::normalize::{ParsedContent, normalize};
use crate::parser::DocumentParser;
use crate::storage::{DocumentKind, DocumentStore, StoredDocument};

/// Drives per-document indexing into the vector index.
///
/// Each document gets its own partition named after its ID. Chunk IDs are
/// deterministic for identical parser output, so a re-index re-upserts the
/// same IDs and also repairs a partition left partial by an earlier crash.
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    parser: Arc<dyn DocumentParser>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    config: RagConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl Indexer {
    /// Create an indexer over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        parser: Arc<dyn DocumentParser>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        config: RagConfig,
    ) -> Self {
        Self { store, parser, embedder, index, config, in_flight: Mutex::new(HashSet::new()) }
    }

    /// Index one document into the partition named after `document_id`.
    ///
    /// A concurrent duplicate trigger for the same document is skipped; the
    /// deterministic chunk-ID scheme makes a racing re-run harmless anyway,
    /// the guard just avoids doing the work twice. An empty document is not a
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the document is not in the store
    /// (terminal, not retried), or a backend error if parsing, embedding, or
    /// upserting fails.
    pub async fn index_document(&self, document_id: &str) -> Result<()> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(document_id.to_string()) {
                info!(document_id, "indexing already in progress, skipping duplicate trigger");
                return Ok(());
            }
        }
        let result = self.run_index(document_id).await;
        self.in_flight.lock().await.remove(document_id);
        result
    }

    async fn run_index(&self, document_id: &str) -> Result<()> {
        let started = Instant::now();

        let document = bounded(
            "document store resolve",
            self.config.backend_timeout,
            self.store.resolve(document_id),
        )
        .await?
        .ok_or_else(|| RagError::NotFound { resource: "document", id: document_id.to_string() })?;

        let parsed = self.parse_document(&document).await?;

        let mut default_metadata = Metadata::new();
        default_metadata.insert("file_id".to_string(), json!(document_id));
        default_metadata.insert("file_name".to_string(), json!(document.file_name));

        let chunks =
            normalize(&parsed, document_id, &default_metadata, self.config.max_words_per_chunk);
        if chunks.is_empty() {
            info!(document_id, "document produced no chunks, nothing to index");
            return Ok(());
        }

        let vectors = self.embed_chunks(&chunks).await?;
        if vectors.len() != chunks.len() {
            warn!(
                document_id,
                chunk_count = chunks.len(),
                embedding_count = vectors.len(),
                "embedding count does not match chunk count, indexing best-effort"
            );
        }
        let entries: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();

        bounded(
            "partition create",
            self.config.backend_timeout,
            self.index.ensure_partition(document_id),
        )
        .await?;
        bounded(
            "partition upsert",
            self.config.backend_timeout,
            self.index.upsert(document_id, &entries),
        )
        .await?;

        info!(
            document_id,
            chunk_count = entries.len(),
            elapsed_s = started.elapsed().as_secs_f64(),
            "indexed document"
        );
        Ok(())
    }

    /// Parse by detected type. An unknown type tries the tabular parser
    /// first, then falls back to raw text, so no supported-but-unrecognized
    /// extension is silently skipped.
    async fn parse_document(&self, document: &StoredDocument) -> Result<ParsedContent> {
        match document.kind {
            DocumentKind::Tabular => self.parser.parse_tabular(document).await,
            DocumentKind::Pdf => self.parser.parse_pdf(document).await,
            DocumentKind::Text => self.parser.parse_text(document).await,
            DocumentKind::Unknown => match self.parser.parse_tabular(document).await {
                Ok(content) => Ok(content),
                Err(err) => {
                    debug!(
                        file_name = %document.file_name,
                        error = %err,
                        "tabular parse failed for unknown type, falling back to raw text"
                    );
                    self.parser.parse_text(document).await
                }
            },
        }
    }

    /// Embed chunk texts in fixed-size batches to bound peak memory,
    /// concatenating results in order.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for (batch_index, batch) in chunks.chunks(self.config.embed_batch_size).enumerate() {
            debug!(batch_index, batch_size = batch.len(), "embedding batch");
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let embedded = bounded(
                "embedding batch",
                self.config.backend_timeout,
                self.embedder.embed_batch(&texts),
            )
            .await?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Remove a document: delete its partition and its stored file.
    ///
    /// A partition that never existed (the document may never have finished
    /// indexing) is success, not an error.
    pub async fn remove_document(&self, document_id: &str) -> Result<()> {
        bounded(
            "partition delete",
            self.config.backend_timeout,
            self.index.delete_partition(document_id),
        )
        .await?;
        bounded("document store delete", self.config.backend_timeout, self.store.delete(document_id))
            .await?;
        info!(document_id, "removed document");
        Ok(())
    }
}
