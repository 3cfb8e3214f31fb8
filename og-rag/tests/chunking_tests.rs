//! Property and example tests for boundary-aware segmentation.

use og_rag::{Chunker, DocType, Document, DocumentMetadata, DocumentTags, RagError, Segmenter};
use proptest::prelude::*;

fn metadata() -> DocumentMetadata {
    DocumentMetadata::new("bsee", DocType::SafetyAlert, "alert_412.pdf")
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end - start).collect()
}

fn arb_params() -> impl Strategy<Value = (usize, usize, usize)> {
    (2usize..120).prop_flat_map(|size| (Just(size), 1..size, 0usize..60))
}

mod prop_segmentation {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunk_text_matches_offsets_and_stride(
            text in "[a-zA-Z0-9é日本 .!?\n]{0,600}",
            (size, overlap, window) in arb_params(),
        ) {
            let segmenter = Segmenter::new(size, overlap).unwrap().with_boundary_window(window);
            let chunks = segmenter.segment("doc", &text, &metadata());
            let stride = size - overlap;

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
                prop_assert_eq!(chunk.total_chunks, chunks.len());
                prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
                prop_assert!(chunk.start < chunk.end);
                prop_assert!(chunk.end - chunk.start <= size);
                prop_assert_eq!(chunk.start % stride, 0);
                prop_assert_eq!(&chunk.text, &char_slice(&text, chunk.start, chunk.end));
                prop_assert!(!chunk.text.trim().is_empty());
                prop_assert_eq!(&chunk.metadata, &metadata());
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[0].start < pair[1].start);
            }
        }

        #[test]
        fn every_visible_character_is_covered(
            text in "[a-zé日 .\n]{1,500}",
            (size, overlap, window) in arb_params(),
        ) {
            let segmenter = Segmenter::new(size, overlap).unwrap().with_boundary_window(window);
            let chunks = segmenter.segment("doc", &text, &metadata());

            for (i, c) in text.chars().enumerate() {
                if !c.is_whitespace() {
                    prop_assert!(
                        chunks.iter().any(|chunk| chunk.start <= i && i < chunk.end),
                        "character {} not covered", i
                    );
                }
            }
        }

        #[test]
        fn segmentation_is_deterministic(
            text in "[a-z .\n]{0,400}",
            (size, overlap, window) in arb_params(),
        ) {
            let segmenter = Segmenter::new(size, overlap).unwrap().with_boundary_window(window);
            prop_assert_eq!(
                segmenter.segment("doc", &text, &metadata()),
                segmenter.segment("doc", &text, &metadata())
            );
        }

        #[test]
        fn overlap_is_exact_without_boundary_refinement(
            text in "[a-zé日]{1,500}",
            (size, overlap, _) in arb_params(),
        ) {
            let segmenter = Segmenter::new(size, overlap).unwrap();
            let chunks = segmenter.segment("doc", &text, &metadata());
            let len = text.chars().count();
            let stride = size - overlap;

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.start, i * stride);
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].end, pair[0].start + size);
                prop_assert_eq!(pair[0].end - pair[1].start, overlap);
            }
            prop_assert_eq!(chunks.last().map(|c| c.end), Some(len));
        }
    }
}

#[test]
fn long_document_uses_fixed_stride() {
    let text = "x".repeat(2500);
    let chunks = Segmenter::new(1000, 200).unwrap().segment("doc", &text, &metadata());
    let spans: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
    assert_eq!(spans, [(0, 1000), (800, 1800), (1600, 2500)]);
}

#[test]
fn short_document_is_a_single_chunk() {
    let text = "Pressure test the BOP stack before drilling out.";
    let chunks = Segmenter::new(1000, 200).unwrap().segment("doc", text, &metadata());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
    assert_eq!((chunks[0].start, chunks[0].end), (0, text.chars().count()));
}

#[test]
fn empty_and_blank_text_produce_no_chunks() {
    let segmenter = Segmenter::new(100, 10).unwrap();
    assert!(segmenter.segment("doc", "", &metadata()).is_empty());
    assert!(segmenter.segment("doc", " \n\n \t ", &metadata()).is_empty());
}

#[test]
fn cut_moves_back_to_paragraph_break() {
    let text = format!("{}\n\n{}", "a".repeat(90), "b".repeat(200));
    let chunks = Segmenter::new(100, 30)
        .unwrap()
        .with_boundary_window(20)
        .segment("doc", &text, &metadata());
    assert_eq!((chunks[0].start, chunks[0].end), (0, 92));
    assert!(chunks[0].text.ends_with("\n\n"));
    assert_eq!(chunks[1].start, 70);
}

#[test]
fn cut_moves_back_to_sentence_end() {
    let text = format!("{}. {}", "a".repeat(85), "b".repeat(200));
    let chunks = Segmenter::new(100, 30)
        .unwrap()
        .with_boundary_window(20)
        .segment("doc", &text, &metadata());
    assert_eq!(chunks[0].end, 86);
    assert!(chunks[0].text.ends_with('.'));
}

#[test]
fn abbreviation_is_not_a_sentence_end() {
    let text = format!("{} Dr. {}", "a".repeat(82), "b".repeat(200));
    let chunks = Segmenter::new(100, 30)
        .unwrap()
        .with_boundary_window(20)
        .segment("doc", &text, &metadata());
    assert_eq!(chunks[0].end, 100);
}

#[test]
fn multibyte_offsets_are_characters() {
    let text = "井口压力异常。".repeat(40);
    let chunks = Segmenter::new(50, 10).unwrap().segment("doc", &text, &metadata());
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert_eq!(chunk.text.chars().count(), chunk.end - chunk.start);
        assert_eq!(chunk.text, char_slice(&text, chunk.start, chunk.end));
    }
}

#[test]
fn chunker_trait_uses_document_fields() {
    let document = Document::new("bulletin_7", "Inspect pipeline welds.", metadata());
    let chunks = Segmenter::new(100, 10).unwrap().chunk(&document);
    assert_eq!(chunks[0].id, "bulletin_7_0");
    assert_eq!(chunks[0].document_id, "bulletin_7");
    assert!(chunks[0].embedding.is_none());
}

#[test]
fn chunks_carry_document_tags_and_count() {
    let tags = DocumentTags::new(vec!["blowout preventer"], vec!["well kick"], vec!["drilling"]);
    let metadata = metadata().with_tags(tags.clone());
    let text = "The crew shut in the well after the kick was detected. ".repeat(20);
    let chunks = Segmenter::new(200, 40).unwrap().segment("alert_412", &text, &metadata);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.metadata.tags == tags && c.total_chunks == chunks.len()));
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(matches!(Segmenter::new(0, 0), Err(RagError::ConfigError(_))));
    assert!(matches!(Segmenter::new(100, 0), Err(RagError::ConfigError(_))));
    assert!(matches!(Segmenter::new(100, 100), Err(RagError::ConfigError(_))));
    assert!(matches!(Segmenter::new(100, 150), Err(RagError::ConfigError(_))));
}
