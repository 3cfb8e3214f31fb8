//! Summary statistics over a segmented corpus.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, DocType};

/// Counts and average chunk length, broken down by source and document type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkingStats {
    /// Number of distinct parent documents.
    pub total_documents: usize,
    pub total_chunks: usize,
    /// Mean chunk length in characters, `0.0` for an empty corpus.
    pub avg_chunk_length: f64,
    /// Chunk count per source.
    pub by_source: BTreeMap<String, usize>,
    /// Chunk count per document type.
    pub by_doc_type: BTreeMap<DocType, usize>,
}

impl ChunkingStats {
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let mut stats = Self::default();
        let mut documents = BTreeSet::new();
        let mut total_chars = 0usize;

        for chunk in chunks {
            documents.insert(chunk.document_id.as_str());
            total_chars += chunk.char_len();
            stats.total_chunks += 1;
            *stats.by_source.entry(chunk.metadata.source.clone()).or_default() += 1;
            *stats.by_doc_type.entry(chunk.metadata.doc_type).or_default() += 1;
        }

        stats.total_documents = documents.len();
        if stats.total_chunks > 0 {
            stats.avg_chunk_length = total_chars as f64 / stats.total_chunks as f64;
        }
        stats
    }
}
