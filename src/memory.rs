//! In-memory vector index using cosine distance.
//!
//! [`InMemoryVectorIndex`] is a reference [`VectorIndex`] backed by nested
//! `HashMap`s behind a `tokio::sync::RwLock`. It is suitable for development
//! and testing; production deployments plug in an external index behind the
//! same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

#[derive(Debug, Clone)]
struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// An in-memory [`VectorIndex`] using cosine distance for search.
///
/// Partitions are stored as nested maps: partition name → chunk ID → chunk.
/// The index owns an [`EmbeddingProvider`] for query-time embedding, since
/// [`VectorIndex::query`] takes raw text.
pub struct InMemoryVectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    partitions: RwLock<HashMap<String, HashMap<String, StoredChunk>>>,
}

impl InMemoryVectorIndex {
    /// Create an empty index that embeds query text with the given provider.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, partitions: RwLock::new(HashMap::new()) }
    }
}

/// Cosine distance in `[0, 2]`: `1 - cos_sim`, clamped at zero against
/// floating-point drift. Zero-magnitude vectors get the maximum distance for
/// a non-negative similarity, 1.0.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).max(0.0)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_partition(&self, name: &str) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        partitions.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, partition: &str, entries: &[(Chunk, Vec<f32>)]) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let store = partitions
            .get_mut(partition)
            .ok_or_else(|| RagError::NotFound { resource: "partition", id: partition.to_string() })?;
        for (chunk, vector) in entries {
            store.insert(
                chunk.id.clone(),
                StoredChunk { chunk: chunk.clone(), vector: vector.clone() },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        partition: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let query_vector = self.embedder.embed(query_text).await?;

        let partitions = self.partitions.read().await;
        let store = partitions
            .get(partition)
            .ok_or_else(|| RagError::NotFound { resource: "partition", id: partition.to_string() })?;

        let mut results: Vec<RetrievalResult> = store
            .values()
            .map(|stored| RetrievalResult {
                chunk_id: stored.chunk.id.clone(),
                partition: partition.to_string(),
                text: stored.chunk.text.clone(),
                metadata: stored.chunk.metadata.clone(),
                distance: Some(cosine_distance(&stored.vector, &query_vector)),
            })
            .collect();

        results.sort_by(|a, b| {
            a.sort_distance().partial_cmp(&b.sort_distance()).unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_partition(&self, name: &str) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        partitions.remove(name);
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        let partitions = self.partitions.read().await;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
