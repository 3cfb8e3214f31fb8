//! Grounding context assembly.
//!
//! [`assemble`] packs ranked candidates into a character budget. A candidate
//! is either included whole or skipped; chunk text is never cut, since a
//! partial chunk could be attributed to the wrong source.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{Candidate, DocType};

/// Links an included chunk back to its source for citation rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// The chunk identifier.
    pub id: String,
    pub source: String,
    pub doc_type: DocType,
    pub source_file: String,
    pub score: f32,
}

/// One chunk included in a [`Context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub text: String,
    pub citation: Citation,
}

/// No candidate fit into the context budget.
///
/// Non-fatal: the query proceeds without grounding and the caller decides
/// how to present that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("context overflow: none of {candidates} candidates fit in {budget} characters (smallest is {smallest})")]
pub struct ContextOverflow {
    /// Number of candidates offered.
    pub candidates: usize,
    /// The character budget.
    pub budget: usize,
    /// Length of the shortest candidate, in characters.
    pub smallest: usize,
}

/// Ranked chunks selected for the generator, with their citations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Included chunks, in ranked order.
    pub entries: Vec<ContextEntry>,
    /// Sum of included text lengths, in characters.
    pub total_chars: usize,
    /// Number of candidates skipped because they did not fit.
    pub skipped: usize,
    /// Set when candidates were offered but none fit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<ContextOverflow>,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.entries.iter().map(|e| &e.citation)
    }

    /// Render the knowledge-base block handed to the generator.
    ///
    /// Each entry becomes a numbered `<source>` element carrying its origin,
    /// type and file so the model can cite it; elements are separated by a
    /// blank line.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "<source id=\"{}\" origin=\"{}\" type=\"{}\" file=\"{}\">\n{}\n</source>",
                    i + 1,
                    entry.citation.source.to_uppercase(),
                    entry.citation.doc_type,
                    entry.citation.source_file,
                    entry.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Pack `candidates` (already ranked) into at most `max_context_chars` characters.
///
/// Candidates are taken in order; one that would exceed the remaining budget
/// is skipped and assembly continues with the next. When candidates were
/// given but none fit, the returned context is empty and carries a
/// [`ContextOverflow`].
pub fn assemble(candidates: &[Candidate], max_context_chars: usize) -> Context {
    let mut context = Context::default();

    for candidate in candidates {
        let chars = candidate.text().chars().count();
        if context.total_chars + chars > max_context_chars {
            context.skipped += 1;
            continue;
        }
        context.total_chars += chars;
        context.entries.push(ContextEntry {
            text: candidate.text().to_string(),
            citation: Citation {
                id: candidate.id.clone(),
                source: candidate.metadata.source.clone(),
                doc_type: candidate.metadata.doc_type,
                source_file: candidate.metadata.source_file.clone(),
                score: candidate.score,
            },
        });
    }

    if context.entries.is_empty() && !candidates.is_empty() {
        let smallest = candidates.iter().map(|c| c.text().chars().count()).min().unwrap_or(0);
        let overflow =
            ContextOverflow { candidates: candidates.len(), budget: max_context_chars, smallest };
        warn!(error = %overflow, "assembled empty context");
        context.overflow = Some(overflow);
    }

    debug!(
        included = context.entries.len(),
        skipped = context.skipped,
        total_chars = context.total_chars,
        "assembled context"
    );
    context
}
