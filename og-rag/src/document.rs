//! Data types for documents, chunks, index records and retrieval candidates.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// The category of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    InvestigationReport,
    General,
    EquipmentManual,
    Troubleshooting,
    Guidance,
    SafetyAlert,
    AdvisoryBulletin,
    Regulation,
    WellControl,
    Glossary,
}

impl DocType {
    /// Every variant, in declaration order.
    pub const ALL: [DocType; 10] = [
        DocType::InvestigationReport,
        DocType::General,
        DocType::EquipmentManual,
        DocType::Troubleshooting,
        DocType::Guidance,
        DocType::SafetyAlert,
        DocType::AdvisoryBulletin,
        DocType::Regulation,
        DocType::WellControl,
        DocType::Glossary,
    ];

    /// The snake_case name used in metadata and index payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::InvestigationReport => "investigation_report",
            DocType::General => "general",
            DocType::EquipmentManual => "equipment_manual",
            DocType::Troubleshooting => "troubleshooting",
            DocType::Guidance => "guidance",
            DocType::SafetyAlert => "safety_alert",
            DocType::AdvisoryBulletin => "advisory_bulletin",
            DocType::Regulation => "regulation",
            DocType::WellControl => "well_control",
            DocType::Glossary => "glossary",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DocType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| RagError::UnknownDocType(s.to_string()))
    }
}

/// Metadata attached to a document and inherited by each of its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Originating agency or category, lowercase (e.g. `bsee`, `phmsa`).
    pub source: String,
    /// The document's category.
    pub doc_type: DocType,
    /// Identifier of the file the text was extracted from.
    pub source_file: String,
    /// Equipment, hazard and operation tags for filtering.
    #[serde(flatten)]
    pub tags: DocumentTags,
}

/// Domain tags supplied with a document and copied onto each of its chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentTags {
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub hazards: Vec<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl DocumentTags {
    /// Build tags, dropping blank entries and trimming the rest.
    pub fn new<I, S>(equipment: I, hazards: I, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        fn clean<I: IntoIterator<Item = S>, S: AsRef<str>>(values: I) -> Vec<String> {
            values
                .into_iter()
                .map(|v| v.as_ref().trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        }
        Self { equipment: clean(equipment), hazards: clean(hazards), operations: clean(operations) }
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty() && self.hazards.is_empty() && self.operations.is_empty()
    }
}

impl DocumentMetadata {
    /// Create metadata with an already-typed [`DocType`].
    ///
    /// Sources are agency codes and are stored trimmed and lowercase so that
    /// index filters match regardless of how the extractor spelled them.
    pub fn new(source: impl Into<String>, doc_type: DocType, source_file: impl Into<String>) -> Self {
        let source = source.into().trim().to_lowercase();
        Self { source, doc_type, source_file: source_file.into(), tags: DocumentTags::default() }
    }

    pub fn with_tags(mut self, tags: DocumentTags) -> Self {
        self.tags = tags;
        self
    }

    /// Create metadata from an untyped `doc_type` string.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnknownDocType`] if `doc_type` is not a known category.
    pub fn parse(
        source: impl Into<String>,
        doc_type: &str,
        source_file: impl Into<String>,
    ) -> Result<Self, RagError> {
        Ok(Self::new(source, doc_type.parse()?, source_file))
    }
}

/// A source document with its extracted text. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The extracted text.
    pub text: String,
    /// Source, category and file of the document.
    pub metadata: DocumentMetadata,
    /// Publication date, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata, date: None }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Build the deterministic identifier of the `index`-th chunk of a document.
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{document_id}_{index}")
}

/// A contiguous segment of a [`Document`].
///
/// `text` is exactly the parent's text between the character offsets
/// `start` (inclusive) and `end` (exclusive). The embedding is `None` until
/// the ingestion pass attaches it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier, see [`chunk_id`].
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The chunk's text.
    pub text: String,
    /// Start character offset in the parent text.
    pub start: usize,
    /// End character offset (exclusive) in the parent text.
    pub end: usize,
    /// Position in the parent's chunk sequence, contiguous from 0.
    pub index: usize,
    /// Number of chunks the parent document produced.
    pub total_chunks: usize,
    /// Metadata inherited from the parent document.
    pub metadata: DocumentMetadata,
    /// The vector embedding, once computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Return the chunk with its embedding attached.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Convert into an index record. Returns `None` if no embedding is attached.
    pub fn into_record(self) -> Option<VectorRecord> {
        let vector = self.embedding?;
        Some(VectorRecord {
            id: self.id,
            vector,
            metadata: RecordMetadata {
                document_id: self.document_id,
                source: self.metadata.source,
                doc_type: self.metadata.doc_type,
                source_file: self.metadata.source_file,
                text: self.text,
                start: self.start,
                end: self.end,
                chunk_index: self.index,
            },
        })
    }
}

/// The metadata persisted alongside each vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    pub document_id: String,
    pub source: String,
    pub doc_type: DocType,
    pub source_file: String,
    /// The chunk's text, returned with search results for context assembly.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub chunk_index: usize,
}

/// A vector and its metadata, as written to the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// An index search hit: a chunk identifier, its similarity score and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// The chunk identifier.
    pub id: String,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
    /// The stored chunk metadata.
    pub metadata: RecordMetadata,
}

impl Candidate {
    pub fn text(&self) -> &str {
        &self.metadata.text
    }
}
