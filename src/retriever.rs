//! Retrieval merger: fan a query out across partitions and merge by distance.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::deadline::bounded;
use crate::document::RetrievalResult;
use crate::error::RagError;
use crate::index::VectorIndex;

/// Retrieve up to `top_k` results for `query_text` across the target
/// partitions (the filter if given, else all known partitions).
///
/// Partitions are queried concurrently; a failing partition contributes no
/// results and never aborts the request. A partition that does not exist yet
/// is treated as empty — the document may still be indexing.
pub async fn retrieve(
    index: &Arc<dyn VectorIndex>,
    query_text: &str,
    top_k: usize,
    partition_filter: Option<&[String]>,
    timeout: Duration,
) -> Vec<RetrievalResult> {
    let targets: Vec<String> = match partition_filter {
        Some(partitions) => partitions.to_vec(),
        None => match bounded("partition list", timeout, index.list_partitions()).await {
            Ok(partitions) => partitions,
            Err(err) => {
                warn!(error = %err, "failed to list partitions, retrieval returns empty");
                Vec::new()
            }
        },
    };
    debug!(partitions = targets.len(), top_k, "fanning out retrieval");

    let queries = targets.iter().map(|partition| {
        let index = Arc::clone(index);
        async move {
            match bounded("partition query", timeout, index.query(partition, query_text, top_k))
                .await
            {
                Ok(results) => results,
                Err(RagError::NotFound { .. }) => {
                    debug!(partition = %partition, "partition not indexed yet, skipping");
                    Vec::new()
                }
                Err(err) => {
                    warn!(partition = %partition, error = %err, "partition query failed, skipping");
                    Vec::new()
                }
            }
        }
    });

    let partials: Vec<RetrievalResult> = join_all(queries).await.into_iter().flatten().collect();
    merge_results(partials, top_k)
}

/// Merge partial results from independent partitions: sort ascending by
/// distance (missing distance sorts last), deduplicate on
/// `(partition, chunk_id)` keeping the lowest-distance occurrence, and
/// truncate to `top_k`.
///
/// The sort is stable, so equal distances keep their first-encounter order —
/// there is no secondary ranking signal to break ties with.
pub fn merge_results(mut results: Vec<RetrievalResult>, top_k: usize) -> Vec<RetrievalResult> {
    results.sort_by(|a, b| {
        a.sort_distance().partial_cmp(&b.sort_distance()).unwrap_or(Ordering::Equal)
    });

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged = Vec::with_capacity(top_k.min(results.len()));
    for result in results {
        if seen.insert((result.partition.clone(), result.chunk_id.clone())) {
            merged.push(result);
            if merged.len() >= top_k {
                break;
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn result(partition: &str, chunk_id: &str, distance: Option<f32>) -> RetrievalResult {
        RetrievalResult {
            chunk_id: chunk_id.to_string(),
            partition: partition.to_string(),
            text: format!("{partition}/{chunk_id}"),
            metadata: Metadata::new(),
            distance,
        }
    }

    #[test]
    fn merge_sorts_ascending_with_missing_distance_last() {
        let merged = merge_results(
            vec![
                result("a", "1", Some(0.8)),
                result("b", "1", None),
                result("a", "2", Some(0.2)),
            ],
            10,
        );
        let ids: Vec<&str> = merged.iter().map(|r| r.chunk_id.as_str()).collect();
        let partitions: Vec<&str> = merged.iter().map(|r| r.partition.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "1"]);
        assert_eq!(partitions, vec!["a", "a", "b"]);
    }

    #[test]
    fn merge_dedupes_keeping_lowest_distance() {
        let merged = merge_results(
            vec![result("a", "1", Some(0.9)), result("a", "1", Some(0.1))],
            10,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].distance, Some(0.1));
    }

    #[test]
    fn merge_truncates_to_top_k() {
        let results: Vec<RetrievalResult> =
            (0..10).map(|i| result("a", &i.to_string(), Some(i as f32))).collect();
        assert_eq!(merge_results(results, 3).len(), 3);
    }

    #[test]
    fn equal_distances_keep_first_encounter_order() {
        let merged = merge_results(
            vec![result("a", "1", Some(0.5)), result("b", "1", Some(0.5))],
            10,
        );
        assert_eq!(merged[0].partition, "a");
        assert_eq!(merged[1].partition, "b");
    }
}
