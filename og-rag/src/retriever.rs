//! Query-time retrieval: embed, search, threshold, dedup, rank.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{validate_min_score, validate_top_k};
use crate::document::Candidate;
use crate::embedding::EmbeddingAdapter;
use crate::error::{RagError, Result};
use crate::retry::with_timeout;
use crate::vectorstore::{MetadataFilter, VectorStore};

/// Turns a question into a ranked list of relevant [`Candidate`]s.
///
/// The retriever shares the ingestion [`EmbeddingAdapter`], so query vectors
/// come from the same model configuration as the indexed ones.
#[derive(Clone)]
pub struct Retriever {
    embedder: EmbeddingAdapter,
    store: Arc<dyn VectorStore>,
    over_fetch: usize,
    index_timeout: Duration,
}

impl Retriever {
    /// Create a retriever over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConsistencyError`] if the embedder and the store
    /// disagree on vector dimension.
    pub fn new(embedder: EmbeddingAdapter, store: Arc<dyn VectorStore>) -> Result<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(RagError::ConsistencyError {
                expected: store.dimensions(),
                actual: embedder.dimensions(),
            });
        }
        Ok(Self { embedder, store, over_fetch: 2, index_timeout: Duration::from_secs(10) })
    }

    /// Multiplier applied to `top_k` for the index query. `1` disables over-fetching.
    pub fn with_over_fetch(mut self, multiplier: usize) -> Self {
        self.over_fetch = multiplier.max(1);
        self
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    /// Retrieve at most `top_k` candidates scoring at least `min_score`,
    /// ordered by descending score.
    ///
    /// An empty result means nothing relevant was found; it is not an error.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `top_k` is outside `1..=50` or
    ///   `min_score` is outside `[0, 1]`
    /// - embedding errors from the [`EmbeddingAdapter`], unchanged
    /// - [`RagError::UpstreamTimeout`] if the index query exceeds its budget
    pub async fn retrieve(&self, query: &str, top_k: usize, min_score: f32) -> Result<Vec<Candidate>> {
        self.retrieve_filtered(query, top_k, min_score, None).await
    }

    /// Like [`retrieve`](Self::retrieve), restricted to records matching `filter`.
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        validate_top_k(top_k)?;
        validate_min_score(min_score)?;
        if query.trim().is_empty() {
            return Err(RagError::ConfigError("query must not be empty".to_string()));
        }

        let query_vector = self.embedder.embed(query).await?;

        let fetch = top_k.saturating_mul(self.over_fetch);
        let hits = with_timeout(
            "index query",
            self.index_timeout,
            self.store.query(&query_vector, fetch, filter),
        )
        .await?;
        let fetched = hits.len();

        let ranked = rank_candidates(hits, top_k, min_score);
        debug!(backend = self.store.backend(), fetch, fetched, "index query returned");
        info!(top_k, min_score, result_count = ranked.len(), "retrieval completed");
        Ok(ranked)
    }
}

/// Threshold, deduplicate, order and truncate raw index hits.
///
/// Candidates below `min_score` are dropped. For duplicate ids the
/// highest-scoring copy is kept. Ordering is by descending score; equal scores
/// keep their index order.
pub fn rank_candidates(hits: Vec<Candidate>, top_k: usize, min_score: f32) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = hits.into_iter().filter(|c| c.score >= min_score).collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    ranked.retain(|c| seen.insert(c.id.clone()));
    ranked.truncate(top_k);
    ranked
}
