//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small corpora.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Candidate, VectorRecord};
use crate::error::Result;
use crate::vectorstore::{MetadataFilter, VectorStore, check_dimensions, check_top_k};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct StoredRecord {
    record: VectorRecord,
    /// Insertion order, kept across replacements; breaks score ties.
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, StoredRecord>,
    next_seq: u64,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Records with equal scores are returned in insertion order, so results are
/// deterministic.
///
/// # Example
///
/// ```rust,ignore
/// use og_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.upsert(record).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty store for vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, inner: RwLock::new(Inner::default()) }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn backend(&self) -> &str {
        BACKEND
    }

    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        check_dimensions(self.dimensions, &record.vector)?;
        let mut inner = self.inner.write().await;
        let seq = match inner.records.get(&record.id) {
            Some(existing) => existing.seq,
            None => {
                inner.next_seq += 1;
                inner.next_seq
            }
        };
        inner.records.insert(record.id.clone(), StoredRecord { record, seq });
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        check_top_k(BACKEND, top_k)?;
        check_dimensions(self.dimensions, vector)?;

        let inner = self.inner.read().await;
        let mut scored: Vec<(f32, u64, &VectorRecord)> = inner
            .records
            .values()
            .filter(|stored| filter.is_none_or(|f| f.matches(&stored.record.metadata)))
            .map(|stored| (cosine_similarity(&stored.record.vector, vector), stored.seq, &stored.record))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        debug!(backend = BACKEND, top_k, hits = scored.len(), "in-memory query");
        Ok(scored
            .into_iter()
            .map(|(score, _, record)| Candidate {
                id: record.id.clone(),
                score,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}
