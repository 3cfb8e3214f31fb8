//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default number of results returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Largest `top_k` a query may request.
pub const MAX_TOP_K: usize = 50;

/// Default minimum similarity score for a candidate to count as relevant.
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

/// Configuration parameters for the RAG pipeline.
///
/// Timeouts and backoff delays are stored in milliseconds so the struct
/// serialises to plain numbers; use the `*_timeout()` accessors for
/// [`Duration`]s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Nominal chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// How far back from a nominal cut the segmenter looks for a sentence or
    /// paragraph boundary. Capped below `chunk_overlap`; 0 disables it.
    pub boundary_window: usize,
    /// Documents shorter than this after normalisation are skipped at ingestion.
    pub min_document_chars: usize,
    /// Number of results returned per query.
    pub top_k: usize,
    /// Minimum similarity score; candidates below it are dropped.
    pub min_score: f32,
    /// Character budget for the assembled grounding context.
    pub max_context_chars: usize,
    /// Multiplier applied to `top_k` when querying the index, so that enough
    /// candidates survive threshold filtering and deduplication.
    pub over_fetch: usize,
    /// Maximum number of texts sent to the embedding provider per call.
    pub embed_batch_size: usize,
    /// Maximum number of documents ingested concurrently.
    pub ingest_concurrency: usize,
    /// Attempts made for transient embedding failures, including the first.
    pub retry_attempts: u32,
    /// Initial backoff delay between retries, doubled on each attempt.
    pub retry_base_delay_ms: u64,
    /// Budget for one embedding call.
    pub embed_timeout_ms: u64,
    /// Budget for one index query.
    pub index_timeout_ms: u64,
    /// Budget for one answer generation call.
    pub generate_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            boundary_window: 100,
            min_document_chars: 200,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            max_context_chars: 12_000,
            over_fetch: 2,
            embed_batch_size: 100,
            ingest_concurrency: 20,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            embed_timeout_ms: 10_000,
            index_timeout_ms: 10_000,
            generate_timeout_ms: 60_000,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Budget for one embedding call.
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    /// Budget for one index query.
    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms)
    }

    /// Budget for one answer generation call.
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }

    /// Initial retry backoff.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Check that all parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k` is outside `1..=50`
    /// - `min_score` is outside `[0, 1]`
    /// - `max_context_chars`, `over_fetch`, `embed_batch_size`,
    ///   `ingest_concurrency` or `retry_attempts` is zero
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        validate_top_k(self.top_k)?;
        validate_min_score(self.min_score)?;
        let positive = [
            ("max_context_chars", self.max_context_chars),
            ("over_fetch", self.over_fetch),
            ("embed_batch_size", self.embed_batch_size),
            ("ingest_concurrency", self.ingest_concurrency),
            ("retry_attempts", self.retry_attempts as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Both sizes must be positive with `chunk_overlap < chunk_size`.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap == 0 {
        return Err(RagError::ConfigError("chunk_overlap must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

pub(crate) fn validate_top_k(top_k: usize) -> Result<()> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(RagError::ConfigError(format!(
            "top_k ({top_k}) must be between 1 and {MAX_TOP_K}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_min_score(min_score: f32) -> Result<()> {
    if !min_score.is_finite() || !(0.0..=1.0).contains(&min_score) {
        return Err(RagError::ConfigError(format!(
            "min_score ({min_score}) must lie in [0, 1]"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the nominal chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the boundary look-back window in characters.
    pub fn boundary_window(mut self, window: usize) -> Self {
        self.config.boundary_window = window;
        self
    }

    /// Set the minimum document length accepted at ingestion.
    pub fn min_document_chars(mut self, chars: usize) -> Self {
        self.config.min_document_chars = chars;
        self
    }

    /// Set the number of results returned per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = score;
        self
    }

    /// Set the context character budget.
    pub fn max_context_chars(mut self, chars: usize) -> Self {
        self.config.max_context_chars = chars;
        self
    }

    /// Set the index over-fetch multiplier.
    pub fn over_fetch(mut self, multiplier: usize) -> Self {
        self.config.over_fetch = multiplier;
        self
    }

    /// Set the embedding batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the number of documents ingested concurrently.
    pub fn ingest_concurrency(mut self, workers: usize) -> Self {
        self.config.ingest_concurrency = workers;
        self
    }

    /// Set the number of attempts for transient embedding failures.
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    /// Set the initial retry backoff.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the embedding call budget.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the index query budget.
    pub fn index_timeout(mut self, timeout: Duration) -> Self {
        self.config.index_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the answer generation budget.
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] under the conditions listed on
    /// [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
