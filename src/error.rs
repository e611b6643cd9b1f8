//! Error types for the `docrag` crate.

use thiserror::Error;

/// Errors that can occur in the retrieval-augmented answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// A referenced document or partition does not exist.
    ///
    /// Always non-fatal for the answering path: callers convert it to empty
    /// results or report it to the immediate caller.
    #[error("{resource} '{id}' not found")]
    NotFound {
        /// The kind of resource that was missing (`"document"`, `"partition"`).
        resource: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    VectorIndex {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the generative backend.
    #[error("Generation error ({backend}): {message}")]
    Generation {
        /// The generative backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A backend call exceeded its deadline.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The configured limit in seconds.
        seconds: u64,
    },

    /// An error occurred while parsing a stored document.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The background index worker is no longer accepting jobs.
    #[error("Index worker error: {0}")]
    Worker(String),

    /// An invalid call parameter. This is the only error class that the
    /// answering path surfaces to its caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
