//! Reads extracted documents from disk.
//!
//! A corpus directory holds one `<name>.txt` per document and an optional
//! `<name>.json` sidecar with `source`, `doc_type`, `date` and the
//! `equipment`, `hazards` and `operations` tag lists. Text is
//! normalised on load, so chunk offsets refer to the normalised text.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use og_rag::{DocType, Document, DocumentMetadata, DocumentTags, normalize_text};
use serde::Deserialize;
use tracing::{debug, warn};

const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Default, Deserialize)]
struct Sidecar {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    equipment: Vec<String>,
    #[serde(default)]
    hazards: Vec<String>,
    #[serde(default)]
    operations: Vec<String>,
}

/// A file that could not be turned into a [`Document`].
#[derive(Debug)]
pub struct Rejected {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub rejected: Vec<Rejected>,
}

/// Load every `.txt` file in `dir`, in file-name order.
///
/// Files with unreadable text, malformed sidecars or an unknown `doc_type`
/// are collected in [`Corpus::rejected`] rather than failing the load.
pub fn load_corpus(dir: &Path) -> anyhow::Result<Corpus> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read corpus directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    let mut corpus = Corpus::default();
    for path in paths {
        match load_document(&path) {
            Ok(document) => corpus.documents.push(document),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rejected document");
                corpus.rejected.push(Rejected { path, reason: format!("{e:#}") });
            }
        }
    }
    debug!(loaded = corpus.documents.len(), rejected = corpus.rejected.len(), "loaded corpus");
    Ok(corpus)
}

fn load_document(path: &Path) -> anyhow::Result<Document> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("file name is not valid UTF-8: {}", path.display()))?
        .to_string();
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let sidecar = read_sidecar(&path.with_extension("json"))?;

    let doc_type = match sidecar.doc_type.as_deref() {
        Some(value) => value.parse::<DocType>()?,
        None => DocType::General,
    };
    let source = sidecar.source.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
    let tags = DocumentTags::new(sidecar.equipment, sidecar.hazards, sidecar.operations);
    let metadata = DocumentMetadata::new(source, doc_type, id.clone()).with_tags(tags);

    let mut document = Document::new(id, normalize_text(&raw), metadata);
    if let Some(date) = sidecar.date.as_deref().and_then(parse_date) {
        document = document.with_date(date);
    }
    Ok(document)
}

fn read_sidecar(path: &Path) -> anyhow::Result<Sidecar> {
    if !path.exists() {
        return Ok(Sidecar::default());
    }
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("malformed metadata in {}", path.display()))
}

/// Accepts ISO dates, optionally followed by a time component.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
