//! Error types for the `og-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in chunking, retrieval and answer generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration or request parameter is invalid. Raised before any work starts.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Document metadata named a category outside [`DocType`](crate::DocType).
    #[error("Unknown document type '{0}'")]
    UnknownDocType(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is transient (network, rate limit, 5xx) and worth retrying.
        retryable: bool,
    },

    /// Embedding dimensionality does not match the index's declared dimension.
    ///
    /// This means ingestion and query time are not using the same model
    /// configuration. It is never retried.
    #[error("Consistency error: expected {expected}-dimensional vectors, got {actual}")]
    ConsistencyError {
        /// Dimension declared by the index.
        expected: usize,
        /// Dimension actually produced.
        actual: usize,
    },

    /// An upstream call exceeded its time budget.
    #[error("Upstream timeout: {operation} did not complete within {timeout:?}")]
    UpstreamTimeout {
        /// The operation that timed out (`embed`, `index query`, `generate`).
        operation: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generator failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Shorthand for an embedding failure that should not be retried.
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into(), retryable: false }
    }

    /// Shorthand for a transient embedding failure.
    pub fn embedding_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into(), retryable: true }
    }

    /// Whether a backoff retry of the failed call may succeed.
    ///
    /// Timeouts are excluded; they get a single retry at the pipeline level.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingError { retryable: true, .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
