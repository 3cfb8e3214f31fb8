//! Cleanup of extracted document text before segmentation.

use std::sync::LazyLock;

use regex::Regex;

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Page \d+\]\n*").expect("valid regex"));
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static EXCESS_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));
static PAGE_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Page \d+ of \d+[ \t]*$").expect("valid regex"));

/// Normalise text produced by the PDF/HTML extractors.
///
/// - `[Page N]` markers become paragraph breaks
/// - runs of three or more newlines collapse to one blank line
/// - runs of spaces collapse to a single space
/// - `Page N of M` header/footer lines are removed
/// - leading and trailing whitespace is trimmed
///
/// Chunk offsets are relative to the normalised text, so ingestion stores
/// the normalised form as the document text.
pub fn normalize_text(text: &str) -> String {
    let text = PAGE_MARKER.replace_all(text, "\n\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, " ");
    let text = PAGE_FOOTER.replace_all(&text, "");
    text.trim().to_string()
}
