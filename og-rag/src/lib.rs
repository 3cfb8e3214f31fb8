//! # og-rag
//!
//! Chunking, retrieval and grounded answering over oil & gas regulatory and
//! safety documents.
//!
//! ## Overview
//!
//! Extracted document text goes through two passes:
//!
//! - **Ingestion** – [`Segmenter`] splits each document into overlapping,
//!   boundary-aware chunks; the [`EmbeddingAdapter`] embeds them; a
//!   [`VectorStore`] stores them under deterministic ids.
//! - **Query** – the [`Retriever`] embeds the question with the same adapter,
//!   thresholds and ranks index hits, and [`assemble`] packs them into a
//!   character budget for an [`AnswerGenerator`].
//!
//! [`RagPipeline`] wires both passes together.
//!
//! ## Backends
//!
//! - [`InMemoryVectorStore`] – always available, for tests and small corpora
//! - `QdrantVectorStore` – behind the `qdrant` feature
//! - `OpenAIEmbeddingProvider` / `OpenAIChatGenerator` – behind the `openai` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use og_rag::{InMemoryVectorStore, QueryRequest, RagConfig, RagPipeline};
//! use og_rag::openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_env()?))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(1536)))
//!     .generator(Arc::new(OpenAIChatGenerator::from_env()?))
//!     .build()?;
//!
//! pipeline.ingest_batch(&documents).await?;
//! let response = pipeline.answer(&QueryRequest::new("What are BOP testing requirements?")).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod retriever;
pub mod retry;
pub mod stats;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, Segmenter};
pub use config::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K, MAX_TOP_K, RagConfig, RagConfigBuilder};
pub use context::{Citation, Context, ContextEntry, ContextOverflow, assemble};
pub use document::{
    Candidate, Chunk, DocType, Document, DocumentMetadata, DocumentTags, RecordMetadata, VectorRecord,
    chunk_id,
};
pub use embedding::{EmbeddingAdapter, EmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{
    AnswerGenerator, CONTEXT_OVERFLOW_ANSWER, NO_RESULTS_ANSWER, SYSTEM_PROMPT, user_prompt,
};
pub use inmemory::InMemoryVectorStore;
pub use normalize::normalize_text;
pub use pipeline::{DocumentFailure, IngestReport, RagPipeline, RagPipelineBuilder};
pub use query::{QueryRequest, QueryResponse, SourceRef};
pub use retriever::{Retriever, rank_candidates};
pub use retry::RetryPolicy;
pub use stats::ChunkingStats;
pub use vectorstore::{BatchUpsertReport, FailedUpsert, IndexStats, MetadataFilter, VectorStore};

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
