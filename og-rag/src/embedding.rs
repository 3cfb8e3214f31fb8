//! Embedding provider trait and the adapter used at ingestion and query time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::retry::{RetryPolicy, with_retry, with_timeout};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (OpenAI, local models,
/// etc.) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Providers report transient failures with
/// [`RagError::embedding_transient`] so the adapter can retry them.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name for logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Wraps an [`EmbeddingProvider`] with the guarantees the pipeline relies on.
///
/// The same adapter instance is used for ingestion and for queries, so both
/// sides share one model configuration. Every vector it returns has exactly
/// `dimensions` entries; anything else is a [`RagError::ConsistencyError`]
/// raised before the vector can reach the index. Calls are bounded by a
/// timeout and transient failures are retried with exponential backoff.
#[derive(Clone)]
pub struct EmbeddingAdapter {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    timeout: Duration,
    retry: RetryPolicy,
    batch_size: usize,
}

impl EmbeddingAdapter {
    /// Create an adapter whose output must match `dimensions`, normally the
    /// index's declared dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConsistencyError`] if the provider already reports a
    /// different dimensionality.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> Result<Self> {
        let reported = provider.dimensions();
        if reported != dimensions {
            return Err(RagError::ConsistencyError { expected: dimensions, actual: reported });
        }
        Ok(Self {
            provider,
            dimensions,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            batch_size: 100,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum number of texts per provider call; larger inputs are split.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingError`] when the provider fails (after retries for
    ///   transient failures)
    /// - [`RagError::UpstreamTimeout`] when the call exceeded its budget (not retried here)
    /// - [`RagError::ConsistencyError`] on a dimension mismatch
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::embedding(self.provider.name(), "cannot embed empty text"));
        }
        let vector = with_retry(&self.retry, "embed", || {
            with_timeout("embed", self.timeout, self.provider.embed(text))
        })
        .await
        .inspect_err(|e| error!(provider = self.provider.name(), error = %e, "embedding failed"))?;
        self.check_dimensions(&vector)?;
        Ok(vector)
    }

    /// Embed many texts, preserving order, one vector per input.
    ///
    /// # Errors
    ///
    /// Same as [`embed`](Self::embed); additionally an
    /// [`RagError::EmbeddingError`] if the provider returns a different number
    /// of vectors than texts.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(provider = self.provider.name(), batch_size = batch.len(), "embedding batch");
            let embedded = with_retry(&self.retry, "embed", || {
                with_timeout("embed", self.timeout, self.provider.embed_batch(batch))
            })
            .await
            .inspect_err(|e| error!(provider = self.provider.name(), error = %e, "batch embedding failed"))?;

            if embedded.len() != batch.len() {
                return Err(RagError::embedding(
                    self.provider.name(),
                    format!("expected {} embeddings, got {}", batch.len(), embedded.len()),
                ));
            }
            for vector in &embedded {
                self.check_dimensions(vector)?;
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            error!(
                provider = self.provider.name(),
                expected = self.dimensions,
                actual = vector.len(),
                "embedding dimension mismatch"
            );
            return Err(RagError::ConsistencyError { expected: self.dimensions, actual: vector.len() });
        }
        Ok(())
    }
}
