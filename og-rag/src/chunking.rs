//! Document segmentation.
//!
//! [`Segmenter`] splits extracted text into overlapping, metadata-tagged
//! [`Chunk`]s with character-offset bookkeeping. Chunk starts follow a fixed
//! stride of `chunk_size - chunk_overlap`; only the end of a chunk moves, pulled
//! back to a paragraph or sentence break when one is close to the nominal cut.

use crate::config::validate_chunking;
use crate::document::{Chunk, Document, DocumentMetadata, chunk_id};
use crate::error::Result;

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, offsets and metadata but no
/// embeddings. Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: [&str; 12] =
    ["mr", "mrs", "ms", "dr", "prof", "inc", "ltd", "corp", "vs", "etc", "e.g", "i.e"];

/// Boundary-aware fixed-stride segmenter.
///
/// Chunk `i` starts at character `i * (chunk_size - chunk_overlap)`. Its end is
/// the nominal `start + chunk_size`, unless a paragraph break (`\n\n`) or
/// sentence end lies within `boundary_window` characters before it, in which
/// case the chunk ends there. The window is capped at `chunk_overlap - 1` so
/// consecutive chunks always share at least one character and the chunks cover
/// the whole text.
///
/// # Example
///
/// ```rust,ignore
/// use og_rag::{Segmenter, DocumentMetadata, DocType};
///
/// let segmenter = Segmenter::new(1000, 200)?.with_boundary_window(100);
/// let metadata = DocumentMetadata::new("bsee", DocType::SafetyAlert, "alert_412");
/// let chunks = segmenter.segment("alert_412", &text, &metadata);
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_size: usize,
    chunk_overlap: usize,
    boundary_window: usize,
}

impl Segmenter {
    /// Create a segmenter with boundary refinement disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
    /// either size is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap, boundary_window: 0 })
    }

    /// Set how many characters before a nominal cut are searched for a boundary.
    pub fn with_boundary_window(mut self, window: usize) -> Self {
        self.boundary_window = window;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    fn effective_window(&self) -> usize {
        self.boundary_window.min(self.chunk_overlap - 1)
    }

    /// Split `text` into chunks tagged with `metadata`.
    ///
    /// Offsets are character offsets. Pure-whitespace chunks are dropped, and
    /// sequence indices stay contiguous across the ones that remain.
    pub fn segment(&self, document_id: &str, text: &str, metadata: &DocumentMetadata) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }

        // byte_at[i] is the byte offset of character i; byte_at[len] == text.len()
        let byte_at: Vec<usize> =
            text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();

        let stride = self.stride();
        let window = self.effective_window();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let nominal_end = (start + self.chunk_size).min(len);
            let is_last = nominal_end == len;
            let end = if is_last {
                len
            } else {
                refine_cut(&chars, start + stride + 1, nominal_end, window)
            };

            let slice = &text[byte_at[start]..byte_at[end]];
            if !slice.trim().is_empty() {
                let index = chunks.len();
                chunks.push(Chunk {
                    id: chunk_id(document_id, index),
                    document_id: document_id.to_string(),
                    text: slice.to_string(),
                    start,
                    end,
                    index,
                    total_chunks: 0,
                    metadata: metadata.clone(),
                    embedding: None,
                });
            }

            if is_last {
                break;
            }
            start += stride;
        }

        let total = chunks.len();
        for chunk in &mut chunks {
            chunk.total_chunks = total;
        }
        chunks
    }
}

impl Chunker for Segmenter {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.segment(&document.id, &document.text, &document.metadata)
    }
}

/// Pick the cut for a non-final chunk.
///
/// Searches `[max(nominal - window, floor), nominal]` from the nominal cut
/// backwards. The nearest paragraph break wins, then the nearest sentence end,
/// then the nominal cut itself.
fn refine_cut(chars: &[char], floor: usize, nominal: usize, window: usize) -> usize {
    if window == 0 {
        return nominal;
    }
    let lowest = nominal.saturating_sub(window).max(floor);
    let mut sentence_cut = None;

    for cut in (lowest..=nominal).rev() {
        if is_paragraph_break(chars, cut) {
            return cut;
        }
        if sentence_cut.is_none() && is_sentence_end(chars, cut) {
            sentence_cut = Some(cut);
        }
    }

    sentence_cut.unwrap_or(nominal)
}

fn is_paragraph_break(chars: &[char], cut: usize) -> bool {
    cut >= 2 && chars[cut - 1] == '\n' && chars[cut - 2] == '\n'
}

/// A cut right after `.`, `!` or `?` that is followed by whitespace, excluding
/// abbreviations and numbered-list markers.
fn is_sentence_end(chars: &[char], cut: usize) -> bool {
    if cut == 0 || cut >= chars.len() {
        return false;
    }
    let terminator = chars[cut - 1];
    if !matches!(terminator, '.' | '!' | '?') || !chars[cut].is_whitespace() {
        return false;
    }
    if terminator != '.' {
        return true;
    }
    if cut >= 2 && chars[cut - 2].is_ascii_digit() {
        return false;
    }

    let word_start = chars[..cut - 1]
        .iter()
        .rposition(|c| !(c.is_alphabetic() || *c == '.'))
        .map_or(0, |p| p + 1);
    let word: String = chars[word_start..cut - 1].iter().collect::<String>().to_lowercase();
    !ABBREVIATIONS.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn sentence_end_detection() {
        let text = chars("Valve closed. Dr. Smith said 2. items e.g. here! ok");
        // after "closed."
        assert!(is_sentence_end(&text, 13));
        // after "Dr."
        assert!(!is_sentence_end(&text, 17));
        // after "2."
        assert!(!is_sentence_end(&text, 31));
        // after "e.g."
        assert!(!is_sentence_end(&text, 42));
        // after "here!"
        assert!(is_sentence_end(&text, 48));
    }

    #[test]
    fn paragraph_break_preferred_over_sentence() {
        let text = chars("aaaa.\n\nbbbb. cccc dddd");
        // nominal cut at 18, window 15 reaches back to the paragraph break at 7
        assert_eq!(refine_cut(&text, 1, 18, 15), 7);
        // a narrow window only sees the sentence end at 12
        assert_eq!(refine_cut(&text, 1, 18, 8), 12);
    }

    #[test]
    fn cut_never_reaches_floor_boundary() {
        let text = chars("ab. cdefghijkl");
        // boundary at 3 is below the floor, nominal cut is kept
        assert_eq!(refine_cut(&text, 5, 10, 9), 10);
    }

    #[test]
    fn window_is_capped_below_overlap() {
        let segmenter = Segmenter::new(100, 20).unwrap().with_boundary_window(500);
        assert_eq!(segmenter.effective_window(), 19);
    }
}
