//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Candidate, DocType, RecordMetadata, VectorRecord};
use crate::error::{RagError, Result};

/// Restricts a query to records whose metadata matches every set field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Match records from this source (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Match records of this document type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.doc_type.is_none()
    }

    pub fn matches(&self, metadata: &RecordMetadata) -> bool {
        let source_ok =
            self.source.as_ref().is_none_or(|s| s.eq_ignore_ascii_case(&metadata.source));
        let doc_type_ok = self.doc_type.is_none_or(|t| t == metadata.doc_type);
        source_ok && doc_type_ok
    }
}

/// A record that could not be written during a batch upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpsert {
    pub id: String,
    pub reason: String,
}

/// Outcome of [`VectorStore::upsert_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpsertReport {
    /// Number of records written.
    pub upserted: usize,
    /// Records that failed, with the reason for each.
    pub failed: Vec<FailedUpsert>,
}

impl BatchUpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Vector count and dimension of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimensions: usize,
}

/// A storage backend for chunk vectors with cosine similarity search.
///
/// An instance is bound to one index of a fixed dimension. Scores returned by
/// [`query`](VectorStore::query) are raw similarities; thresholding is the
/// retriever's job.
///
/// # Example
///
/// ```rust,ignore
/// use og_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new(1536);
/// store.upsert(record).await?;
/// let hits = store.query(&query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The dimension every stored and queried vector must have.
    fn dimensions(&self) -> usize;

    /// A short name for logs and error messages.
    fn backend(&self) -> &str;

    /// Create the underlying index if it does not exist yet.
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    /// Insert or replace one record.
    async fn upsert(&self, record: VectorRecord) -> Result<()>;

    /// Insert or replace many records, reporting per-record failures instead of aborting.
    ///
    /// The default implementation upserts records one by one.
    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
        let mut report = BatchUpsertReport::default();
        for record in records {
            let id = record.id.clone();
            match self.upsert(record).await {
                Ok(()) => report.upserted += 1,
                Err(e) => report.failed.push(FailedUpsert { id, reason: e.to_string() }),
            }
        }
        Ok(report)
    }

    /// Return at most `top_k` records most similar to `vector`, ordered by descending score.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>>;

    /// Remove every record from the index.
    async fn delete_all(&self) -> Result<()>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Vector count and dimension.
    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats { total_vectors: self.count().await?, dimensions: self.dimensions() })
    }
}

/// Reject vectors whose length differs from the index dimension.
pub fn check_dimensions(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(RagError::ConsistencyError { expected, actual: vector.len() });
    }
    Ok(())
}

/// Reject a zero `top_k`.
pub fn check_top_k(backend: &str, top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(RagError::ConfigError(format!("{backend}: top_k must be greater than zero")));
    }
    Ok(())
}
