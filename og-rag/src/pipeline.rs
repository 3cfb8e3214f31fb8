//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates offline ingestion (segment → embed →
//! upsert) and online question answering (retrieve → assemble → generate)
//! by composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`]
//! and an optional [`AnswerGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use og_rag::{RagPipeline, RagConfig, InMemoryVectorStore, QueryRequest};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(1536)))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! let report = pipeline.ingest_batch(documents).await?;
//! let response = pipeline.answer(&QueryRequest::new("What causes ESP failures?")).await?;
//! ```

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, Segmenter};
use crate::config::RagConfig;
use crate::context::assemble;
use crate::document::{Candidate, Chunk, Document, VectorRecord};
use crate::embedding::{EmbeddingAdapter, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, CONTEXT_OVERFLOW_ANSWER, NO_RESULTS_ANSWER};
use crate::query::{QueryRequest, QueryResponse, SourceRef};
use crate::retriever::Retriever;
use crate::retry::{RetryPolicy, retry_once_on_timeout, with_timeout};
use crate::vectorstore::{IndexStats, MetadataFilter, VectorStore};

/// A document that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub id: String,
    pub reason: String,
}

/// Summary of an ingestion run.
///
/// Id lists are sorted so reports are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents whose chunks were all written.
    pub succeeded: Vec<String>,
    /// Documents that failed, with the reason for each.
    pub failed: Vec<DocumentFailure>,
    /// Documents below the minimum length, not segmented.
    pub skipped: Vec<String>,
    /// Total chunks written.
    pub chunks: usize,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. All adapters are created once
/// and shared by reference; the pipeline holds no per-request state, so one
/// instance can serve concurrent queries.
pub struct RagPipeline {
    config: RagConfig,
    embedder: EmbeddingAdapter,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Create the index if needed.
    pub async fn ensure_index(&self) -> Result<()> {
        self.vector_store.ensure_index().await.inspect_err(|e| {
            error!(backend = self.vector_store.backend(), error = %e, "failed to prepare index");
        })
    }

    /// Remove every vector from the index (full corpus rebuild).
    pub async fn delete_all(&self) -> Result<()> {
        self.vector_store.delete_all().await.inspect_err(|e| {
            error!(backend = self.vector_store.backend(), error = %e, "failed to clear index");
        })?;
        info!(backend = self.vector_store.backend(), "cleared index");
        Ok(())
    }

    /// Vector count and dimension of the index.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.vector_store.stats().await
    }

    /// Whether a document is too short to be worth segmenting.
    pub fn is_too_short(&self, document: &Document) -> bool {
        document.text.chars().count() < self.config.min_document_chars
    }

    /// Segment a document without embedding or storing it.
    pub fn segment(&self, document: &Document) -> Vec<Chunk> {
        self.chunker.chunk(document)
    }

    /// Ingest a single document: segment → embed → upsert.
    ///
    /// Every chunk is embedded and dimension-checked before the first write,
    /// so a [`RagError::ConsistencyError`] never leaves a partial document in
    /// the index. Returns the stored chunks with embeddings attached.
    ///
    /// # Errors
    ///
    /// Embedding errors propagate unchanged, after one retry on timeout. If any
    /// record is rejected by the store, a [`RagError::VectorStoreError`] names
    /// how many failed.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings =
            retry_once_on_timeout(self.config.retry_base_delay(), || self.embedder.embed_batch(&texts))
                .await
                .inspect_err(|e| {
                    error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                })?;

        let chunks: Vec<Chunk> =
            chunks.into_iter().zip(embeddings).map(|(c, e)| c.with_embedding(e)).collect();
        let records: Vec<VectorRecord> = chunks.iter().cloned().filter_map(Chunk::into_record).collect();

        let mut failed = Vec::new();
        for batch in records.chunks(self.config.embed_batch_size) {
            let report = self.vector_store.upsert_batch(batch.to_vec()).await.inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            })?;
            failed.extend(report.failed);
        }
        if let Some(first) = failed.first() {
            error!(document.id = %document.id, failed = failed.len(), "records rejected by index");
            return Err(RagError::VectorStoreError {
                backend: self.vector_store.backend().to_string(),
                message: format!(
                    "{} of {} records failed for document '{}' (first: {}: {})",
                    failed.len(),
                    records.len(),
                    document.id,
                    first.id,
                    first.reason
                ),
            });
        }

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest many documents with bounded concurrency.
    ///
    /// A failing document is recorded in the report and does not stop the
    /// others. Documents shorter than `min_document_chars` are skipped.
    ///
    /// # Errors
    ///
    /// Only a [`RagError::ConsistencyError`] aborts the run, since it means
    /// the embedding model and the index disagree for every document.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut pending = Vec::with_capacity(documents.len());
        for document in documents {
            if self.is_too_short(document) {
                warn!(document.id = %document.id, min_chars = self.config.min_document_chars, "skipping short document");
                report.skipped.push(document.id.clone());
            } else {
                pending.push(document);
            }
        }

        let mut results = futures::stream::iter(pending)
            .map(|document| async move { (document.id.clone(), self.ingest(document).await) })
            .buffer_unordered(self.config.ingest_concurrency);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(chunks) => {
                    report.chunks += chunks.len();
                    report.succeeded.push(id);
                }
                Err(e @ RagError::ConsistencyError { .. }) => {
                    error!(document.id = %id, error = %e, "aborting ingestion");
                    return Err(e);
                }
                Err(e) => report.failed.push(DocumentFailure { id, reason: e.to_string() }),
            }
        }

        report.succeeded.sort();
        report.failed.sort_by(|a, b| a.id.cmp(&b.id));
        report.skipped.sort();
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            chunk_count = report.chunks,
            "ingestion run completed"
        );
        Ok(report)
    }

    /// Retrieve ranked candidates, retrying once if an upstream call times out.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        retry_once_on_timeout(self.config.retry_base_delay(), || {
            self.retriever.retrieve_filtered(query, top_k, min_score, filter)
        })
        .await
    }

    /// Answer a question: retrieve → assemble → generate.
    ///
    /// When nothing clears the threshold, or nothing fits the context budget,
    /// the response carries a fixed explanatory answer, no sources, and
    /// `grounded == false`; the generator is not called.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] for an invalid request or when no generator is configured
    /// - retrieval errors (after one retry on timeout)
    /// - [`RagError::GenerationError`] / [`RagError::UpstreamTimeout`] from the generator
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryResponse> {
        request.validate()?;
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| RagError::ConfigError("no answer generator configured".to_string()))?;

        let filter = request.filter();
        let candidates =
            self.retrieve(&request.query, request.top_k, request.min_score, filter.as_ref()).await?;
        if candidates.is_empty() {
            info!(top_k = request.top_k, min_score = request.min_score, "no relevant sources found");
            return Ok(QueryResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
                grounded: false,
            });
        }

        let context = assemble(&candidates, self.config.max_context_chars);
        if context.is_empty() {
            return Ok(QueryResponse {
                answer: CONTEXT_OVERFLOW_ANSWER.to_string(),
                sources: Vec::new(),
                grounded: false,
            });
        }

        let timeout = self.config.generate_timeout();
        let answer = retry_once_on_timeout(self.config.retry_base_delay(), || {
            with_timeout("generate", timeout, generator.generate(&request.query, &context))
        })
        .await
        .inspect_err(|e| error!(generator = generator.name(), error = %e, "generation failed"))?;

        info!(source_count = context.len(), generator = generator.name(), "answered query");
        Ok(QueryResponse {
            answer,
            sources: context.entries.iter().map(SourceRef::from).collect(),
            grounded: true,
        })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_store` are required. Without a `chunker`
/// a [`Segmenter`] is built from the config; without a `generator` only
/// ingestion and retrieval are available.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if a required field is missing or the config is invalid
    /// - [`RagError::ConsistencyError`] if the provider and the store disagree on dimension
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        let embedder = EmbeddingAdapter::new(provider, vector_store.dimensions())?
            .with_timeout(config.embed_timeout())
            .with_retry(RetryPolicy::new(config.retry_attempts, config.retry_base_delay()))
            .with_batch_size(config.embed_batch_size);

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(
                Segmenter::new(config.chunk_size, config.chunk_overlap)?
                    .with_boundary_window(config.boundary_window),
            ),
        };

        let retriever = Retriever::new(embedder.clone(), vector_store.clone())?
            .with_over_fetch(config.over_fetch)
            .with_index_timeout(config.index_timeout());

        Ok(RagPipeline {
            config,
            embedder,
            vector_store,
            chunker,
            retriever,
            generator: self.generator,
        })
    }
}
