//! Background indexing worker.
//!
//! Upload handlers should acknowledge storage immediately and hand indexing
//! off to a queue; until the job runs, the document is stored but not yet
//! searchable (its partition simply contributes no results). One worker task
//! is sufficient — there is no ordering guarantee across different documents.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::engine::RagEngine;
use crate::error::{RagError, Result};

/// A queue handoff for upload-triggered indexing.
///
/// [`enqueue`](IndexWorker::enqueue) returns immediately; a single spawned
/// worker task drains the queue and drives
/// [`RagEngine::index_document`] per job, logging failures instead of
/// propagating them (there is no caller left to propagate to).
pub struct IndexWorker {
    sender: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl IndexWorker {
    /// Spawn the worker task over a shared engine.
    pub fn spawn(engine: Arc<RagEngine>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            while let Some(document_id) = receiver.recv().await {
                if let Err(err) = engine.index_document(&document_id).await {
                    error!(document_id = %document_id, error = %err, "background indexing failed");
                }
            }
            info!("index worker drained and stopped");
        });
        Self { sender, handle }
    }

    /// Queue a document for indexing and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Worker`] if the worker has already shut down.
    pub fn enqueue(&self, document_id: impl Into<String>) -> Result<()> {
        self.sender
            .send(document_id.into())
            .map_err(|_| RagError::Worker("worker has shut down".to_string()))
    }

    /// Stop accepting jobs, drain the queue, and wait for the worker task.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.handle.await;
    }
}
