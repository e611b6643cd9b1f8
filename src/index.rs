//! Vector index gateway trait: partition-scoped upsert, query, and deletion.

use async_trait::async_trait;

use crate::document::{Chunk, RetrievalResult};
use crate::error::Result;

/// A vector similarity index organized into named partitions.
///
/// One partition holds the chunks of one document and is the unit of
/// deletion. Upserts carry caller-produced vectors; queries take raw text
/// because the gateway owns query-time embedding (mirroring backends such as
/// Chroma that embed `query_texts` themselves).
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{InMemoryVectorIndex, VectorIndex};
///
/// index.ensure_partition("doc-1").await?;
/// index.upsert("doc-1", &entries).await?;
/// let results = index.query("doc-1", "quarterly totals", 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a named partition. No-op if it already exists.
    async fn ensure_partition(&self, name: &str) -> Result<()>;

    /// Upsert chunk/vector pairs into a partition.
    ///
    /// Re-upserting an existing chunk ID replaces it, which is what makes
    /// re-indexing idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) if the
    /// partition does not exist.
    async fn upsert(&self, partition: &str, entries: &[(Chunk, Vec<f32>)]) -> Result<()>;

    /// Query one partition for the `top_k` nearest chunks to `query_text`.
    ///
    /// Results are ordered by ascending distance (most relevant first).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`](crate::RagError::NotFound) if the
    /// partition does not exist; callers on the answering path must treat
    /// that as an empty result, not a failure, because a document may not be
    /// indexed yet.
    async fn query(
        &self,
        partition: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>>;

    /// Delete a partition and all its chunks. Deleting an absent partition
    /// succeeds.
    async fn delete_partition(&self, name: &str) -> Result<()>;

    /// List all currently-known partition names.
    async fn list_partitions(&self) -> Result<Vec<String>>;
}
