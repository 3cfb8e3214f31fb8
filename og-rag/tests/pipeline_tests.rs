//! End-to-end ingestion and answering through `RagPipeline`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    DriftingEmbedder, EchoGenerator, HashEmbedder, RejectingEmbedder, StallingEmbedder, StallingGenerator,
    StallingStore, SwitchingEmbedder, document,
};
use og_rag::{
    CONTEXT_OVERFLOW_ANSWER, DocType, Document, DocumentMetadata, InMemoryVectorStore,
    NO_RESULTS_ANSWER, QueryRequest, RagConfig, RagError, RagPipeline, VectorStore,
};

const DIMS: usize = 32;

fn small_config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .boundary_window(40)
        .retry_base_delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn pipeline_with(
    config: RagConfig,
    store: Arc<InMemoryVectorStore>,
    generator: Option<Arc<dyn og_rag::AnswerGenerator>>,
) -> RagPipeline {
    let mut builder = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbedder { dims: DIMS }))
        .vector_store(store);
    if let Some(generator) = generator {
        builder = builder.generator(generator);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn ingest_stores_every_chunk_with_deterministic_ids() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = pipeline_with(small_config(), store.clone(), None);
    let doc = document("alert_412", "BSEE", DocType::SafetyAlert, "blowout preventer", 20);

    let chunks = pipeline.ingest(&doc).await.unwrap();
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.embedding.as_ref().is_some_and(|e| e.len() == DIMS)));
    assert_eq!(chunks[0].id, "alert_412_0");
    assert_eq!(chunks[0].metadata.source, "bsee");
    assert_eq!(store.count().await.unwrap(), chunks.len());

    // re-ingesting replaces rather than duplicates
    pipeline.ingest(&doc).await.unwrap();
    assert_eq!(store.count().await.unwrap(), chunks.len());
}

#[tokio::test]
async fn dimension_drift_aborts_before_any_write() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(small_config())
        .embedding_provider(Arc::new(DriftingEmbedder { dims: DIMS }))
        .vector_store(store.clone())
        .build()
        .unwrap();
    let docs = vec![
        document("a", "bsee", DocType::SafetyAlert, "riser", 10),
        document("b", "bsee", DocType::SafetyAlert, "choke manifold", 10),
    ];

    let result = pipeline.ingest_batch(&docs).await;
    assert!(matches!(result, Err(RagError::ConsistencyError { expected: DIMS, actual }) if actual == DIMS + 1));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn dimension_change_between_calls_stops_before_writing() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(small_config())
        .embedding_provider(Arc::new(SwitchingEmbedder { dims: DIMS, ..Default::default() }))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let first = pipeline.ingest(&document("a", "bsee", DocType::SafetyAlert, "riser", 10)).await.unwrap();
    let second = pipeline.ingest(&document("b", "bsee", DocType::SafetyAlert, "riser", 10)).await;

    assert!(matches!(second, Err(RagError::ConsistencyError { .. })));
    assert_eq!(store.count().await.unwrap(), first.len());
}

#[tokio::test]
async fn mismatched_store_is_rejected_at_build() {
    let result = RagPipeline::builder()
        .embedding_provider(Arc::new(HashEmbedder { dims: 16 }))
        .vector_store(Arc::new(InMemoryVectorStore::new(DIMS)))
        .build();
    assert!(matches!(result, Err(RagError::ConsistencyError { expected: DIMS, actual: 16 })));
}

#[tokio::test]
async fn missing_components_are_config_errors() {
    let result = RagPipeline::builder().vector_store(Arc::new(InMemoryVectorStore::new(DIMS))).build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let bad = RagConfig { chunk_overlap: 1000, ..RagConfig::default() };
    let result = RagPipeline::builder()
        .config(bad)
        .embedding_provider(Arc::new(HashEmbedder { dims: DIMS }))
        .vector_store(Arc::new(InMemoryVectorStore::new(DIMS)))
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

#[tokio::test]
async fn batch_reports_failures_and_skips_without_stopping() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(small_config())
        .embedding_provider(Arc::new(RejectingEmbedder { dims: DIMS, marker: "POISON" }))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let good = document("good", "phmsa", DocType::AdvisoryBulletin, "pipeline corrosion", 12);
    let mut poisoned = document("bad", "osha", DocType::Regulation, "lockout", 12);
    poisoned.text.push_str(" POISON");
    let short = Document::new(
        "short",
        "Too brief to index.",
        DocumentMetadata::new("bsee", DocType::SafetyAlert, "short.pdf"),
    );

    let report = pipeline.ingest_batch(&[poisoned, short, good.clone()]).await.unwrap();
    assert_eq!(report.succeeded, ["good"]);
    assert_eq!(report.skipped, ["short"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "bad");
    assert!(report.failed[0].reason.contains("rejected"));
    assert!(!report.is_complete());

    let expected = pipeline.segment(&good).len();
    assert_eq!(report.chunks, expected);
    assert_eq!(store.count().await.unwrap(), expected);
}

#[tokio::test]
async fn answer_is_grounded_in_ranked_sources() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let generator = Arc::new(EchoGenerator::default());
    let pipeline = pipeline_with(small_config(), store, Some(generator.clone()));
    pipeline
        .ingest_batch(&[
            document("esp_1", "bsee", DocType::InvestigationReport, "electric submersible pump", 15),
            document("comp_1", "osha", DocType::Guidance, "compressor", 15),
        ])
        .await
        .unwrap();

    let request = QueryRequest::new("electric submersible pump inspection").with_top_k(3).with_min_score(0.0);
    let response = pipeline.answer(&request).await.unwrap();

    assert!(response.grounded);
    assert_eq!(response.sources.len(), 3);
    assert!(response.sources.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(response.answer.starts_with("3 sources for:"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn filters_narrow_the_sources() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = pipeline_with(small_config(), store, Some(Arc::new(EchoGenerator::default())));
    pipeline
        .ingest_batch(&[
            document("a", "bsee", DocType::SafetyAlert, "wellhead", 10),
            document("b", "phmsa", DocType::AdvisoryBulletin, "wellhead", 10),
        ])
        .await
        .unwrap();

    let request = QueryRequest::new("wellhead").with_min_score(0.0).with_source("PHMSA");
    let response = pipeline.answer(&request).await.unwrap();
    assert!(!response.sources.is_empty());
    assert!(response.sources.iter().all(|s| s.source == "phmsa"));
}

#[tokio::test]
async fn no_relevant_sources_skips_generation() {
    let generator = Arc::new(EchoGenerator::default());
    let pipeline =
        pipeline_with(small_config(), Arc::new(InMemoryVectorStore::new(DIMS)), Some(generator.clone()));

    let response = pipeline.answer(&QueryRequest::new("What is a kelly valve?")).await.unwrap();
    assert_eq!(response.answer, NO_RESULTS_ANSWER);
    assert!(response.sources.is_empty());
    assert!(!response.grounded);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn oversized_sources_produce_overflow_answer() {
    let config = RagConfig { max_context_chars: 20, ..small_config() };
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let generator = Arc::new(EchoGenerator::default());
    let pipeline = pipeline_with(config, store, Some(generator.clone()));
    pipeline.ingest(&document("a", "bsee", DocType::SafetyAlert, "riser", 10)).await.unwrap();

    let response = pipeline.answer(&QueryRequest::new("riser").with_min_score(0.0)).await.unwrap();
    assert_eq!(response.answer, CONTEXT_OVERFLOW_ANSWER);
    assert!(!response.grounded);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn answering_requires_a_generator_and_a_valid_request() {
    let pipeline = pipeline_with(small_config(), Arc::new(InMemoryVectorStore::new(DIMS)), None);
    let result = pipeline.answer(&QueryRequest::new("q")).await;
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let pipeline = pipeline_with(
        small_config(),
        Arc::new(InMemoryVectorStore::new(DIMS)),
        Some(Arc::new(EchoGenerator::default())),
    );
    let result = pipeline.answer(&QueryRequest::new("q").with_top_k(0)).await;
    assert!(matches!(result, Err(RagError::ConfigError(_))));
}

#[tokio::test(start_paused = true)]
async fn generation_timeout_is_retried_once() {
    let config = RagConfig { generate_timeout_ms: 1_000, ..small_config() };
    let generator = Arc::new(StallingGenerator::new(1, Duration::from_secs(30)));
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = pipeline_with(config, store, Some(generator.clone()));
    pipeline.ingest(&document("a", "bsee", DocType::SafetyAlert, "riser", 10)).await.unwrap();

    let response = pipeline.answer(&QueryRequest::new("riser").with_min_score(0.0)).await.unwrap();
    assert_eq!(response.answer, "recovered");
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn second_generation_timeout_is_returned() {
    let config = RagConfig { generate_timeout_ms: 1_000, ..small_config() };
    let generator = Arc::new(StallingGenerator::new(2, Duration::from_secs(30)));
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = pipeline_with(config, store, Some(generator.clone()));
    pipeline.ingest(&document("a", "bsee", DocType::SafetyAlert, "riser", 10)).await.unwrap();

    let result = pipeline.answer(&QueryRequest::new("riser").with_min_score(0.0)).await;
    assert!(matches!(result, Err(RagError::UpstreamTimeout { ref operation, .. }) if operation == "generate"));
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn embedding_timeout_at_retrieval_is_retried_exactly_once() {
    let config = RagConfig { embed_timeout_ms: 100, ..small_config() };
    let embedder = Arc::new(StallingEmbedder::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .vector_store(Arc::new(InMemoryVectorStore::new(DIMS)))
        .build()
        .unwrap();

    let result = pipeline.retrieve("kick detection", 5, 0.7, None).await;
    assert!(matches!(result, Err(RagError::UpstreamTimeout { ref operation, .. }) if operation == "embed"));
    assert_eq!(embedder.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn index_timeout_at_retrieval_is_retried_exactly_once() {
    let config = RagConfig { index_timeout_ms: 100, ..small_config() };
    let store = Arc::new(StallingStore::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbedder { dims: DIMS }))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let result = pipeline.retrieve("kick detection", 5, 0.7, None).await;
    assert!(matches!(result, Err(RagError::UpstreamTimeout { ref operation, .. }) if operation == "index query"));
    assert_eq!(store.queries(), 2);
}

#[tokio::test(start_paused = true)]
async fn embedding_timeout_during_ingestion_fails_the_document() {
    let config = RagConfig { embed_timeout_ms: 100, ..small_config() };
    let embedder = Arc::new(StallingEmbedder::new(DIMS));
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .build()
        .unwrap();

    let report = pipeline
        .ingest_batch(&[document("a", "bsee", DocType::SafetyAlert, "riser", 10)])
        .await
        .unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(embedder.calls(), 2);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn delete_all_and_stats_reflect_the_index() {
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let pipeline = pipeline_with(small_config(), store, None);
    let chunks = pipeline.ingest(&document("a", "bsee", DocType::SafetyAlert, "riser", 10)).await.unwrap();

    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats.total_vectors, chunks.len());
    assert_eq!(stats.dimensions, DIMS);

    pipeline.delete_all().await.unwrap();
    assert_eq!(pipeline.stats().await.unwrap().total_vectors, 0);
}
