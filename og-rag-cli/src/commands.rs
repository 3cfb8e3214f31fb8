use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use og_rag::{
    ChunkingStats, Document, OpenAIChatGenerator, OpenAIEmbeddingProvider, QdrantVectorStore,
    QueryResponse, RagConfig, RagPipeline, Segmenter, VectorStore,
};
use tracing::{info, warn};

use crate::cli::{BackendArgs, ChunkArgs, Cli, Command, IngestArgs, QueryArgs};
use crate::loader::{Corpus, load_corpus};
use crate::session::{self, SessionSettings};

const CHUNKS_FILE: &str = "all_chunks.jsonl";
const STATS_FILE: &str = "chunking_stats.json";

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Chunk(args) => chunk(config, &args),
        Command::Ingest(args) => ingest(config, &cli.backend, &args).await,
        Command::Query(args) => query(config, &cli.backend, &args).await,
        Command::Stats => stats(&cli.backend).await,
    }
}

/// Defaults, overlaid with the JSON file when one is given.
fn load_config(path: Option<&Path>) -> anyhow::Result<RagConfig> {
    let config = match path {
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        }
        None => RagConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn open_store(backend: &BackendArgs) -> anyhow::Result<Arc<QdrantVectorStore>> {
    let store = QdrantVectorStore::new(&backend.qdrant_url, &backend.collection, backend.dimensions)?;
    Ok(Arc::new(store))
}

fn embedding_provider(backend: &BackendArgs) -> anyhow::Result<OpenAIEmbeddingProvider> {
    let mut provider = OpenAIEmbeddingProvider::from_env()?
        .with_model(&backend.embedding_model)
        .with_dimensions(backend.dimensions);
    if let Some(base_url) = &backend.openai_base_url {
        provider = provider.with_base_url(base_url);
    }
    Ok(provider)
}

fn chat_generator(backend: &BackendArgs) -> anyhow::Result<OpenAIChatGenerator> {
    let mut generator = OpenAIChatGenerator::from_env()?.with_model(&backend.chat_model);
    if let Some(base_url) = &backend.openai_base_url {
        generator = generator.with_base_url(base_url);
    }
    Ok(generator)
}

fn report_rejected(corpus: &Corpus) {
    for rejected in &corpus.rejected {
        eprintln!("  rejected {}: {}", rejected.path.display(), rejected.reason);
    }
}

fn chunk(mut config: RagConfig, args: &ChunkArgs) -> anyhow::Result<()> {
    if let Some(size) = args.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    config.validate()?;
    let segmenter =
        Segmenter::new(config.chunk_size, config.chunk_overlap)?.with_boundary_window(config.boundary_window);

    let mut corpus = load_corpus(&args.input)?;
    report_rejected(&corpus);
    if let Some(source) = &args.source {
        corpus.documents.retain(|document| matches_source(document, source));
        info!(source = %source, documents = corpus.documents.len(), "filtered corpus by source");
    }
    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let chunks_path = args.output.join(CHUNKS_FILE);
    let mut writer = BufWriter::new(
        File::create(&chunks_path).with_context(|| format!("failed to create {}", chunks_path.display()))?,
    );
    let mut all_chunks = Vec::new();
    let mut skipped = 0usize;
    for document in &corpus.documents {
        if document.text.chars().count() < config.min_document_chars {
            warn!(document.id = %document.id, "skipping short document");
            skipped += 1;
            continue;
        }
        for chunk in segmenter.segment(&document.id, &document.text, &document.metadata) {
            serde_json::to_writer(&mut writer, &chunk)?;
            writer.write_all(b"\n")?;
            all_chunks.push(chunk);
        }
    }
    writer.flush()?;

    let stats = ChunkingStats::from_chunks(&all_chunks);
    let stats_path = args.output.join(STATS_FILE);
    fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)
        .with_context(|| format!("failed to write {}", stats_path.display()))?;

    info!(
        chunk_size = segmenter.chunk_size(),
        chunk_overlap = segmenter.chunk_overlap(),
        chunk_count = stats.total_chunks,
        skipped,
        "chunking completed"
    );
    println!(
        "Chunked {} documents into {} chunks (avg {:.0} chars, {} skipped, {} rejected)",
        stats.total_documents,
        stats.total_chunks,
        stats.avg_chunk_length,
        skipped,
        corpus.rejected.len()
    );
    println!("  chunks: {}", chunks_path.display());
    println!("  stats:  {}", stats_path.display());
    Ok(())
}

/// Case-insensitive match on the sidecar source, or a substring of the file name.
fn matches_source(document: &Document, source: &str) -> bool {
    let source = source.trim().to_lowercase();
    document.metadata.source == source || document.id.to_lowercase().contains(&source)
}

async fn ingest(config: RagConfig, backend: &BackendArgs, args: &IngestArgs) -> anyhow::Result<()> {
    let corpus = load_corpus(&args.input)?;
    report_rejected(&corpus);

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedding_provider(backend)?))
        .vector_store(open_store(backend)?)
        .build()?;

    if args.recreate {
        pipeline.delete_all().await?;
    } else {
        pipeline.ensure_index().await?;
    }

    let report = pipeline.ingest_batch(&corpus.documents).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Ingested {} documents ({} chunks), {} failed, {} skipped",
            report.succeeded.len(),
            report.chunks,
            report.failed.len(),
            report.skipped.len()
        );
        for failure in &report.failed {
            println!("  failed {}: {}", failure.id, failure.reason);
        }
    }

    if !corpus.documents.is_empty() && report.succeeded.is_empty() && !report.failed.is_empty() {
        bail!("no document could be ingested");
    }
    Ok(())
}

async fn query(config: RagConfig, backend: &BackendArgs, args: &QueryArgs) -> anyhow::Result<()> {
    let settings = SessionSettings {
        top_k: args.top_k.unwrap_or(config.top_k),
        min_score: args.min_score.unwrap_or(config.min_score),
        source: args.source.clone(),
        doc_type: args.doc_type,
        show_sources: args.show_sources,
    };
    if let Some(question) = &args.question {
        settings.request(question).validate()?;
    }

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedding_provider(backend)?))
        .vector_store(open_store(backend)?)
        .generator(Arc::new(chat_generator(backend)?))
        .build()?;

    let Some(question) = &args.question else {
        return session::run(&pipeline, settings).await;
    };
    let response = pipeline.answer(&settings.request(question)).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response, settings.show_sources);
    }
    Ok(())
}

/// Print an answer, followed by its sources when `show_sources` is set.
pub(crate) fn print_response(response: &QueryResponse, show_sources: bool) {
    println!("{}", response.answer);
    if show_sources && !response.sources.is_empty() {
        println!("\nSources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  [{}] {} {} ({}) score {:.3}",
                i + 1,
                source.source.to_uppercase(),
                source.doc_type,
                source.source_file,
                source.score
            );
        }
    }
}

async fn stats(backend: &BackendArgs) -> anyhow::Result<()> {
    let store = open_store(backend)?;
    let stats = store.stats().await?;
    println!("Collection:    {}", backend.collection);
    println!("Total vectors: {}", stats.total_vectors);
    println!("Dimensions:    {}", stats.dimensions);
    Ok(())
}
