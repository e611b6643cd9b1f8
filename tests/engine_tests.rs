//! End-to-end tests for the answering engine over fake collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use docrag::{
    DocumentParser, DocumentStore, EmbeddingProvider, GenerativeBackend, InMemoryVectorIndex,
    IndexWorker, NO_RELEVANT_DATA, ParsedContent, PlainTextParser, QueryContext, RagEngine,
    RagError, Result, StoredDocument, VectorIndex,
};

const DIM: usize = 16;

/// Deterministic embedder: identical text maps to identical vectors, so a
/// query using a chunk's own words lands near that chunk.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIM];
        for (position, byte) in text.bytes().enumerate() {
            vector[(byte as usize + position) % DIM] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Embedder that drops the last vector of every batch, simulating a
/// miscounting backend.
struct ShortBatchEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortBatchEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        HashEmbedder.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::new();
        for text in texts.iter().take(texts.len().saturating_sub(1)) {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// In-memory document store over a map of stored documents.
#[derive(Default)]
struct MemStore {
    documents: Mutex<HashMap<String, StoredDocument>>,
}

impl MemStore {
    fn with_text(document_id: &str, file_name: &str, text: &str) -> Self {
        let store = Self::default();
        store.insert(document_id, file_name, text.as_bytes().to_vec());
        store
    }

    fn insert(&self, document_id: &str, file_name: &str, content: Vec<u8>) {
        let document = StoredDocument {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            kind: docrag::DocumentKind::from_file_name(file_name),
            content,
        };
        self.documents.lock().unwrap().insert(document_id.to_string(), document);
    }
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn resolve(&self, document_id: &str) -> Result<Option<StoredDocument>> {
        Ok(self.documents.lock().unwrap().get(document_id).cloned())
    }

    async fn delete(&self, document_id: &str) -> Result<()> {
        self.documents.lock().unwrap().remove(document_id);
        Ok(())
    }
}

/// Parser that turns each line of a tabular file into a row record with
/// locator metadata, the shape a real CSV parser hands the normalizer.
struct LineRecordParser;

#[async_trait]
impl DocumentParser for LineRecordParser {
    async fn parse_tabular(&self, document: &StoredDocument) -> Result<ParsedContent> {
        let text = String::from_utf8_lossy(&document.content);
        let rows: Vec<ParsedContent> = text
            .lines()
            .enumerate()
            .map(|(row_index, line)| {
                ParsedContent::from(json!({
                    "id": format!("{}::row={row_index}", document.document_id),
                    "row_text": line,
                    "meta": {"row_index": row_index},
                }))
            })
            .collect();
        Ok(ParsedContent::Sequence(rows))
    }

    async fn parse_pdf(&self, document: &StoredDocument) -> Result<ParsedContent> {
        Err(RagError::Parse(format!("no PDF parser for '{}'", document.file_name)))
    }
}

/// Generative backend returning a canned reply, or an error when unset.
struct ScriptedBackend {
    reply: Option<String>,
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(RagError::Generation {
                backend: "scripted".to_string(),
                message: "quota exceeded".to_string(),
            }),
        }
    }
}

struct Harness {
    engine: Arc<RagEngine>,
    index: Arc<InMemoryVectorIndex>,
}

fn build_harness(
    store: Arc<dyn DocumentStore>,
    parser: Arc<dyn DocumentParser>,
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Option<Arc<dyn GenerativeBackend>>,
) -> Harness {
    let index = Arc::new(InMemoryVectorIndex::new(Arc::new(HashEmbedder)));
    let mut builder = RagEngine::builder()
        .document_store(store)
        .parser(parser)
        .embedding_provider(embedder)
        .vector_index(index.clone() as Arc<dyn VectorIndex>);
    if let Some(backend) = backend {
        builder = builder.generative_backend(backend);
    }
    Harness { engine: Arc::new(builder.build().unwrap()), index }
}

fn text_harness(backend: Option<Arc<dyn GenerativeBackend>>) -> Harness {
    let store = Arc::new(MemStore::with_text(
        "doc-1",
        "notes.txt",
        "quarterly revenue grew by twelve percent across all regions",
    ));
    build_harness(store, Arc::new(PlainTextParser), Arc::new(HashEmbedder), backend)
}

#[tokio::test]
async fn index_then_answer_without_backend_uses_fallback() {
    let harness = text_harness(None);
    harness.engine.index_document("doc-1").await.unwrap();

    let response = harness
        .engine
        .answer_query(QueryContext::new("quarterly revenue grew", 5))
        .await
        .unwrap();

    assert!(!response.backend_used);
    assert!(!response.sources.is_empty());
    assert!(response.structured_answer.answer.starts_with("Based on the retrieved documents:"));
    assert!(response.structured_answer.answer.contains("notes.txt"));
    assert_eq!(response.query, "quarterly revenue grew");
    assert!(response.latency_s >= 0.0);
    for citation in &response.structured_answer.citations {
        let confidence = citation.confidence.unwrap();
        assert!((0.0..=1.0).contains(&confidence));
    }
}

#[tokio::test]
async fn filter_on_unindexed_partition_returns_empty_not_error() {
    let harness = text_harness(None);

    let response = harness
        .engine
        .answer_query(
            QueryContext::new("anything", 5).with_partition_filter(vec!["doc-A".to_string()]),
        )
        .await
        .unwrap();

    assert!(response.sources.is_empty());
    assert_eq!(response.structured_answer.answer, NO_RELEVANT_DATA);
    assert!(response.structured_answer.citations.is_empty());
}

#[tokio::test]
async fn fenced_backend_output_is_repaired_and_used() {
    let backend: Arc<dyn GenerativeBackend> = Arc::new(ScriptedBackend {
        reply: Some("```json\n{\"answer\":\"X\",\"citations\":[]}\n```".to_string()),
    });
    let harness = text_harness(Some(backend));
    harness.engine.index_document("doc-1").await.unwrap();

    let response =
        harness.engine.answer_query(QueryContext::new("revenue?", 5)).await.unwrap();

    assert!(response.backend_used);
    assert_eq!(response.structured_answer.answer, "X");
    assert!(response.structured_answer.citations.is_empty());
}

#[tokio::test]
async fn unterminated_backend_output_falls_back() {
    let backend: Arc<dyn GenerativeBackend> =
        Arc::new(ScriptedBackend { reply: Some("{\"answer\": \"partial text".to_string()) });
    let harness = text_harness(Some(backend));
    harness.engine.index_document("doc-1").await.unwrap();

    let response =
        harness.engine.answer_query(QueryContext::new("revenue?", 5)).await.unwrap();

    assert!(!response.backend_used);
    assert!(response.structured_answer.answer.starts_with("Based on the retrieved documents:"));
}

#[tokio::test]
async fn backend_failure_falls_back_without_error() {
    let backend: Arc<dyn GenerativeBackend> = Arc::new(ScriptedBackend { reply: None });
    let harness = text_harness(Some(backend));
    harness.engine.index_document("doc-1").await.unwrap();

    let response =
        harness.engine.answer_query(QueryContext::new("revenue?", 5)).await.unwrap();

    assert!(!response.backend_used);
    assert!(!response.structured_answer.answer.is_empty());
}

#[tokio::test]
async fn invalid_arguments_are_the_only_answering_errors() {
    let harness = text_harness(None);

    let err = harness.engine.answer_query(QueryContext::new("ok", 0)).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidArgument(_)));

    let err = harness.engine.answer_query(QueryContext::new("  ", 5)).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidArgument(_)));
}

#[tokio::test]
async fn indexing_a_missing_document_reports_not_found() {
    let harness = text_harness(None);
    let err = harness.engine.index_document("no-such-doc").await.unwrap_err();
    assert!(matches!(err, RagError::NotFound { resource: "document", .. }));
}

#[tokio::test]
async fn remove_document_is_idempotent() {
    let harness = text_harness(None);
    harness.engine.index_document("doc-1").await.unwrap();

    harness.engine.remove_document("doc-1").await.unwrap();
    // Second removal: partition and file are already gone.
    harness.engine.remove_document("doc-1").await.unwrap();

    let response = harness
        .engine
        .answer_query(
            QueryContext::new("revenue", 5).with_partition_filter(vec!["doc-1".to_string()]),
        )
        .await
        .unwrap();
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn reindexing_upserts_identical_ids() {
    let harness = text_harness(None);
    harness.engine.index_document("doc-1").await.unwrap();
    let first = harness.index.query("doc-1", "revenue", 100).await.unwrap();

    harness.engine.index_document("doc-1").await.unwrap();
    let second = harness.index.query("doc-1", "revenue", 100).await.unwrap();

    let mut first_ids: Vec<String> = first.iter().map(|r| r.chunk_id.clone()).collect();
    let mut second_ids: Vec<String> = second.iter().map(|r| r.chunk_id.clone()).collect();
    first_ids.sort();
    second_ids.sort();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn tabular_rows_carry_anchor_metadata_into_citations() {
    let store = Arc::new(MemStore::default());
    store.insert("stats", "stats.csv", b"player=Messi | goals=10\nplayer=Salah | goals=9".to_vec());
    let harness =
        build_harness(store, Arc::new(LineRecordParser), Arc::new(HashEmbedder), None);
    harness.engine.index_document("stats").await.unwrap();

    let response = harness
        .engine
        .answer_query(QueryContext::new("player=Messi | goals=10", 5))
        .await
        .unwrap();

    assert!(!response.structured_answer.citations.is_empty());
    let citation = &response.structured_answer.citations[0];
    assert_eq!(citation.file_name, "stats.csv");
    assert!(citation.anchors.as_deref().unwrap().starts_with("row_index="));
}

#[tokio::test]
async fn unknown_extension_falls_back_to_raw_text() {
    let store = Arc::new(MemStore::default());
    store.insert("blob", "export.dat", b"opaque export contents".to_vec());
    let harness = build_harness(store, Arc::new(PlainTextParser), Arc::new(HashEmbedder), None);

    harness.engine.index_document("blob").await.unwrap();

    let results = harness.index.query("blob", "opaque export contents", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_id, "blob::text=0");
}

#[tokio::test]
async fn embedding_count_mismatch_still_indexes_best_effort() {
    let store = Arc::new(MemStore::default());
    store.insert("stats", "stats.csv", b"row one\nrow two\nrow three".to_vec());
    let harness =
        build_harness(store, Arc::new(LineRecordParser), Arc::new(ShortBatchEmbedder), None);

    harness.engine.index_document("stats").await.unwrap();

    // Three rows, two embeddings: the mismatch is surfaced as a warning and
    // the paired prefix is indexed.
    let results = harness.index.query("stats", "row one", 10).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn background_worker_makes_document_searchable() {
    let harness = text_harness(None);
    let worker = IndexWorker::spawn(harness.engine.clone());

    worker.enqueue("doc-1").unwrap();
    worker.shutdown().await;

    let response = harness
        .engine
        .answer_query(QueryContext::new("quarterly revenue grew", 5))
        .await
        .unwrap();
    assert!(!response.sources.is_empty());
}
