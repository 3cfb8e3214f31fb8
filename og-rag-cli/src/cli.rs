//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use og_rag::DocType;

/// og-rag: chunk, index and query oil & gas regulatory and safety documents
#[derive(Parser, Debug)]
#[command(name = "og-rag", version, about, long_about = None)]
pub struct Cli {
    /// JSON file with pipeline settings (chunk sizes, thresholds, timeouts)
    #[arg(short, long, global = true, env = "OG_RAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where vectors live and which models produce them.
///
/// The OpenAI key is read from `OPENAI_API_KEY` only.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Qdrant gRPC endpoint
    #[arg(long, global = true, env = "QDRANT_URL", default_value = "http://localhost:6334")]
    pub qdrant_url: String,

    /// Qdrant collection holding the chunk vectors
    #[arg(long, global = true, env = "OG_RAG_COLLECTION", default_value = "og-rag")]
    pub collection: String,

    /// OpenAI embedding model
    #[arg(long, global = true, env = "OG_RAG_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Embedding dimension; must match the collection
    #[arg(long, global = true, env = "OG_RAG_DIMENSIONS", default_value_t = 1536)]
    pub dimensions: usize,

    /// OpenAI chat model used for answers
    #[arg(long, global = true, env = "OG_RAG_CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Segment a directory of extracted text into JSONL chunks and statistics
    Chunk(ChunkArgs),
    /// Segment, embed and index a directory of extracted text
    Ingest(IngestArgs),
    /// Answer a question from the indexed documents
    Query(QueryArgs),
    /// Show the vector count and dimension of the index
    Stats,
}

#[derive(Args, Debug)]
pub struct ChunkArgs {
    /// Directory of `.txt` files with optional `.json` metadata sidecars
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving `all_chunks.jsonl` and `chunking_stats.json`
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override the nominal chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Override the chunk overlap in characters
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Only chunk documents from this source (matched against the sidecar
    /// source or the file name)
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Directory of `.txt` files with optional `.json` metadata sidecars
    #[arg(short, long)]
    pub input: PathBuf,

    /// Drop every existing vector before ingesting
    #[arg(long)]
    pub recreate: bool,

    /// Print the ingestion report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The question to answer; omit it to start an interactive session
    pub question: Option<String>,

    /// Maximum number of sources
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score in [0, 1]
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Only use documents from this source (e.g. bsee, phmsa)
    #[arg(long)]
    pub source: Option<String>,

    /// Only use documents of this type (e.g. safety_alert)
    #[arg(long, value_parser = parse_doc_type)]
    pub doc_type: Option<DocType>,

    /// Print the retrieved sources after the answer
    #[arg(long)]
    pub show_sources: bool,

    /// Print the full response as JSON (one-shot questions only)
    #[arg(long, requires = "question")]
    pub json: bool,
}

fn parse_doc_type(value: &str) -> Result<DocType, String> {
    value.parse().map_err(|e: og_rag::RagError| e.to_string())
}
