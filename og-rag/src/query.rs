//! Request and response types at the question-answering boundary.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MIN_SCORE, DEFAULT_TOP_K, validate_min_score, validate_top_k};
use crate::context::ContextEntry;
use crate::document::DocType;
use crate::error::{RagError, Result};
use crate::vectorstore::MetadataFilter;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

/// A question with its retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question text.
    pub query: String,
    /// Maximum number of sources, `1..=50`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum similarity score, `[0, 1]`.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Restrict retrieval to one source agency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Restrict retrieval to one document type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
}

impl QueryRequest {
    /// A request with default `top_k` and `min_score` and no filter.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            source: None,
            doc_type: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = Some(doc_type);
        self
    }

    /// Check the request before any work is done.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for an empty query, `top_k` outside
    /// `1..=50` or `min_score` outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(RagError::ConfigError("query is required".to_string()));
        }
        validate_top_k(self.top_k)?;
        validate_min_score(self.min_score)
    }

    /// The metadata filter implied by `source` and `doc_type`, if any.
    pub fn filter(&self) -> Option<MetadataFilter> {
        let filter = MetadataFilter { source: self.source.clone(), doc_type: self.doc_type };
        (!filter.is_empty()).then_some(filter)
    }
}

/// A cited source in a [`QueryResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub doc_type: DocType,
    pub source_file: String,
    pub score: f32,
    pub text: String,
}

impl From<&ContextEntry> for SourceRef {
    fn from(entry: &ContextEntry) -> Self {
        Self {
            source: entry.citation.source.clone(),
            doc_type: entry.citation.doc_type,
            source_file: entry.citation.source_file.clone(),
            score: entry.citation.score,
            text: entry.text.clone(),
        }
    }
}

/// The answer and the sources it was grounded in, ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// `false` when the answer was produced without any grounding context.
    pub grounded: bool,
}
