//! Shared test doubles for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use og_rag::{
    AnswerGenerator, Candidate, Context, DocType, Document, DocumentMetadata, EmbeddingProvider,
    InMemoryVectorStore, MetadataFilter, RagError, RecordMetadata, Result, VectorRecord, VectorStore,
};

/// Bag-of-words embedder: each lowercase word is hashed into one of `dims` buckets.
pub struct HashEmbedder {
    pub dims: usize,
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf29ce484222325, |hash, b| (hash ^ b as u64).wrapping_mul(0x100000001b3))
}

pub fn hash_embedding(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let bucket = (fnv1a(&word.to_lowercase()) % dims as u64) as usize;
        vector[bucket] += 1.0;
    }
    if vector.iter().all(|v| *v == 0.0) {
        vector[0] = 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Returns the same vector for every input.
pub struct ConstantEmbedder {
    pub vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Reports `dims` but produces vectors of `dims + 1`, like a swapped model.
pub struct DriftingEmbedder {
    pub dims: usize,
}

#[async_trait]
impl EmbeddingProvider for DriftingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5; self.dims + 1])
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Correct for the first batch call, then one dimension too wide.
#[derive(Default)]
pub struct SwitchingEmbedder {
    pub dims: usize,
    pub batches: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for SwitchingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text, self.dims))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let width = if self.batches.fetch_add(1, Ordering::SeqCst) == 0 { self.dims } else { self.dims + 1 };
        Ok(texts.iter().map(|text| hash_embedding(text, width)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Hash embedder that rejects any text containing `marker`.
pub struct RejectingEmbedder {
    pub dims: usize,
    pub marker: &'static str,
}

#[async_trait]
impl EmbeddingProvider for RejectingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(self.marker) {
            return Err(RagError::embedding("rejecting", "input rejected by provider"));
        }
        Ok(hash_embedding(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Embedder whose calls never finish within any reasonable budget.
pub struct StallingEmbedder {
    pub dims: usize,
    pub calls: AtomicUsize,
}

impl StallingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StallingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(hash_embedding(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// In-memory store whose queries hang; writes pass through.
pub struct StallingStore {
    pub inner: InMemoryVectorStore,
    pub queries: AtomicUsize,
}

impl StallingStore {
    pub fn new(dims: usize) -> Self {
        Self { inner: InMemoryVectorStore::new(dims), queries: AtomicUsize::new(0) }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for StallingStore {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn backend(&self) -> &str {
        "stalling"
    }

    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        self.inner.upsert(record).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Candidate>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        self.inner.query(vector, top_k, filter).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.inner.delete_all().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// Generator returning a fixed answer and counting calls.
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, question: &str, context: &Context) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} sources for: {question}", context.len()))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Generator whose first `slow_calls` calls hang for `delay`.
pub struct StallingGenerator {
    pub slow_calls: usize,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl StallingGenerator {
    pub fn new(slow_calls: usize, delay: Duration) -> Self {
        Self { slow_calls, delay, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for StallingGenerator {
    async fn generate(&self, _question: &str, _context: &Context) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.slow_calls {
            tokio::time::sleep(self.delay).await;
        }
        Ok("recovered".to_string())
    }
}

/// A document of roughly `sentences * 60` characters about `topic`.
pub fn document(id: &str, source: &str, doc_type: DocType, topic: &str, sentences: usize) -> Document {
    let text = (0..sentences)
        .map(|i| format!("Finding {i}: the {topic} inspection showed wear on the assembly. "))
        .collect::<String>();
    Document::new(id, text.trim_end(), DocumentMetadata::new(source, doc_type, format!("{id}.pdf")))
}

/// A unit vector at cosine `score` from `[1, 0, 0]`.
pub fn vector_with_score(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).max(0.0).sqrt(), 0.0]
}

pub fn record(id: &str, source: &str, doc_type: DocType, text: &str, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector,
        metadata: RecordMetadata {
            document_id: id.split('_').next().unwrap_or(id).to_string(),
            source: source.to_string(),
            doc_type,
            source_file: format!("{id}.pdf"),
            text: text.to_string(),
            start: 0,
            end: text.chars().count(),
            chunk_index: 0,
        },
    }
}
