//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Qdrant only accepts UUIDs or integers as point ids, so each chunk id is
//! mapped to a UUIDv5 and the original id is kept in the payload. The mapping
//! is deterministic, so re-ingesting unchanged text overwrites the same points.
//!
//! # Example
//!
//! ```rust,ignore
//! use og_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", "og-rag", 1536)?;
//! store.ensure_index().await?;
//! let hits = store.query(&query_embedding, 5, None).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{Candidate, RecordMetadata, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{
    BatchUpsertReport, FailedUpsert, MetadataFilter, VectorStore, check_dimensions, check_top_k,
};

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by a single [Qdrant](https://qdrant.tech/) collection
/// with cosine distance.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimensions: usize,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant instance at `url`, bound to `collection`.
    pub fn new(url: &str, collection: impl Into<String>, dimensions: usize) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self::from_client(client, collection, dimensions))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Qdrant, collection: impl Into<String>, dimensions: usize) -> Self {
        Self { client, collection: collection.into(), dimensions }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    /// The Qdrant point id for a chunk id.
    pub fn point_id(chunk_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
    }

    fn to_point(&self, record: VectorRecord) -> Result<PointStruct> {
        check_dimensions(self.dimensions, &record.vector)?;
        let mut payload = serde_json::to_value(&record.metadata).map_err(|e| {
            RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
        })?;
        if let Some(map) = payload.as_object_mut() {
            map.insert("chunk_id".to_string(), serde_json::Value::String(record.id.clone()));
        }
        let payload = Payload::try_from(payload).map_err(|e| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("invalid payload for '{}': {e}", record.id),
        })?;
        Ok(PointStruct::new(Self::point_id(&record.id), record.vector, payload))
    }

    async fn write_points(&self, points: Vec<PointStruct>) -> Result<()> {
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    fn build_filter(filter: &MetadataFilter) -> Filter {
        let mut conditions = Vec::new();
        if let Some(source) = &filter.source {
            conditions.push(Condition::matches("source", source.to_lowercase()));
        }
        if let Some(doc_type) = filter.doc_type {
            conditions.push(Condition::matches("doc_type", doc_type.as_str().to_string()));
        }
        Filter::must(conditions)
    }

    /// Extract a string from a Qdrant payload value.
    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_usize(value: &QdrantValue) -> Option<usize> {
        match &value.kind {
            Some(Kind::IntegerValue(n)) => usize::try_from(*n).ok(),
            Some(Kind::DoubleValue(n)) if *n >= 0.0 => Some(*n as usize),
            _ => None,
        }
    }

    fn to_candidate(point: ScoredPoint) -> Option<Candidate> {
        let payload: &HashMap<String, QdrantValue> = &point.payload;
        let string = |key: &str| payload.get(key).and_then(Self::extract_string);
        let number = |key: &str| payload.get(key).and_then(Self::extract_usize);

        let id = string("chunk_id")?;
        let doc_type = match string("doc_type")?.parse() {
            Ok(doc_type) => doc_type,
            Err(e) => {
                warn!(backend = BACKEND, chunk_id = %id, error = %e, "skipping hit with invalid doc_type");
                return None;
            }
        };

        Some(Candidate {
            score: point.score,
            metadata: RecordMetadata {
                document_id: string("document_id").unwrap_or_default(),
                source: string("source").unwrap_or_default(),
                doc_type,
                source_file: string("source_file").unwrap_or_default(),
                text: string("text").unwrap_or_default(),
                start: number("start").unwrap_or_default(),
                end: number("end").unwrap_or_default(),
                chunk_index: number("chunk_index").unwrap_or_default(),
            },
            id,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn backend(&self) -> &str {
        BACKEND
    }

    async fn ensure_index(&self) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        if collections.collections.iter().any(|c| c.name == self.collection) {
            debug!(collection = %self.collection, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.collection, dimensions = self.dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let point = self.to_point(record)?;
        self.write_points(vec![point]).await
    }

    /// Writes all valid records in one request. If that request fails, records
    /// are retried one at a time so a single bad point does not sink the batch.
    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<BatchUpsertReport> {
        let mut report = BatchUpsertReport::default();
        let mut points = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.clone();
            match self.to_point(record) {
                Ok(point) => {
                    ids.push(id);
                    points.push(point);
                }
                Err(e) => report.failed.push(FailedUpsert { id, reason: e.to_string() }),
            }
        }
        if points.is_empty() {
            return Ok(report);
        }

        match self.write_points(points.clone()).await {
            Ok(()) => report.upserted += points.len(),
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "batch upsert failed, retrying per point");
                for (id, point) in ids.into_iter().zip(points) {
                    match self.write_points(vec![point]).await {
                        Ok(()) => report.upserted += 1,
                        Err(e) => report.failed.push(FailedUpsert { id, reason: e.to_string() }),
                    }
                }
            }
        }

        debug!(
            collection = %self.collection,
            upserted = report.upserted,
            failed = report.failed.len(),
            "upserted records to qdrant"
        );
        Ok(report)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        check_top_k(BACKEND, top_k)?;
        check_dimensions(self.dimensions, vector)?;

        let mut request = SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            request = request.filter(Self::build_filter(filter));
        }

        let response = self.client.search_points(request).await.map_err(Self::map_err)?;
        let candidates: Vec<Candidate> =
            response.result.into_iter().filter_map(Self::to_candidate).collect();

        debug!(collection = %self.collection, top_k, hits = candidates.len(), "qdrant query");
        Ok(candidates)
    }

    async fn delete_all(&self) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        if collections.collections.iter().any(|c| c.name == self.collection) {
            self.client.delete_collection(&self.collection).await.map_err(Self::map_err)?;
            debug!(collection = %self.collection, "deleted qdrant collection");
        }
        self.ensure_index().await
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map_or(0, |r| r.count as usize))
    }
}
