//! Passage splitting strategies.
//!
//! This module provides the [`Splitter`] trait and two implementations:
//!
//! - [`SentenceSplitter`] — one passage per sentence, no size target
//! - [`RecursiveCharacterSplitter`] — fixed-size chunks with overlap, trying
//!   separators in priority order (paragraph, line, sentence, word) before
//!   falling back to character cuts
//!
//! Every produced passage is a new [`Document`] with a fresh id, the parent's
//! metadata, a `parent_id` linking back to the parent, and a `chunk_id` that
//! is contiguous and 0-based among that parent's passages.

use serde_json::json;
use tracing::debug;

use crate::document::{Document, META_CHUNK_ID, META_PARENT_ID};
use crate::error::Result;

/// A strategy for splitting documents into passages.
pub trait Splitter: Send + Sync {
    /// Split a batch of documents into passages.
    ///
    /// A failure aborts the whole batch; no passages from partially processed
    /// documents are returned.
    fn split(&self, documents: &[Document]) -> Result<Vec<Document>>;
}

/// Build a passage document from a parent and its position among siblings.
fn passage(parent: &Document, text: String, chunk_id: usize) -> Document {
    let mut metadata = parent.metadata.clone();
    metadata.insert(META_CHUNK_ID.to_string(), json!(chunk_id));
    metadata.insert(META_PARENT_ID.to_string(), json!(parent.id));
    Document::new(text, metadata)
}

/// Splits text at sentence boundaries, producing one passage per sentence.
///
/// A sentence ends at `.`, `!`, or `?` followed by whitespace. There is no
/// size target; long sentences become long passages.
#[derive(Debug, Clone, Default)]
pub struct SentenceSplitter;

impl SentenceSplitter {
    /// Create a new `SentenceSplitter`.
    pub fn new() -> Self {
        Self
    }
}

/// Split text into sentences, keeping terminators attached.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

impl Splitter for SentenceSplitter {
    fn split(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut passages = Vec::new();
        for document in documents {
            let sentences = split_sentences(&document.text);
            debug!(document.id = %document.id, sentence_count = sentences.len(), "split document");
            for (i, text) in sentences.into_iter().enumerate() {
                passages.push(passage(document, text, i));
            }
        }
        Ok(passages)
    }
}

/// Splits text into fixed-size chunks, trying coarser separators first.
///
/// Segments are merged up to `chunk_size` characters. A segment that still
/// exceeds the budget is re-split with the next separator in
/// `["\n\n", "\n", ". ", " "]`; past the word level, plain character cuts
/// with `chunk_overlap` apply.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Separator priority: paragraph, line, sentence, word.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

impl RecursiveCharacterSplitter {
    /// Create a new `RecursiveCharacterSplitter`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — overlapping characters between consecutive
    ///   character-level chunks
    ///
    /// Overlap applies only at the character-cut fallback, reached when no
    /// separator down to the word level fits a segment into `chunk_size`.
    /// Chunks assembled by merging separator-delimited segments do not
    /// overlap.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Splitter for RecursiveCharacterSplitter {
    fn split(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut passages = Vec::new();
        for document in documents {
            if document.text.is_empty() {
                continue;
            }
            let chunks =
                split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &SEPARATORS);
            debug!(document.id = %document.id, chunk_count = chunks.len(), "split document");
            for (i, text) in chunks.into_iter().enumerate() {
                passages.push(passage(document, text, i));
            }
        }
        Ok(passages)
    }
}

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. A segment that exceeds `chunk_size` is split further with
/// the next-level separator.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.len() <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    let segments: Vec<&str> = if separator == " " {
        text.split_inclusive(' ').collect()
    } else {
        split_keeping_separator(text, separator)
    };

    let mut chunks = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if current.is_empty() {
            current = segment.to_string();
        } else if current.len() + segment.len() <= chunk_size {
            current.push_str(segment);
        } else {
            if current.len() > chunk_size {
                chunks.extend(split_and_merge(
                    &current,
                    chunk_size,
                    chunk_overlap,
                    remaining_separators,
                ));
            } else {
                chunks.push(current);
            }
            current = segment.to_string();
        }
    }

    if !current.is_empty() {
        if current.len() > chunk_size {
            chunks.extend(split_and_merge(&current, chunk_size, chunk_overlap, remaining_separators));
        } else {
            chunks.push(current);
        }
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-level splitting with overlap, the terminal fallback.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 || end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use serde_json::json;

    fn doc(text: &str) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("a.pdf"));
        Document::new(text, metadata)
    }

    #[test]
    fn sentence_splitter_one_passage_per_sentence() {
        let parent = doc("First sentence. Second one! Third?");
        let passages = SentenceSplitter::new().split(std::slice::from_ref(&parent)).unwrap();

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].text, "First sentence.");
        assert_eq!(passages[1].text, "Second one!");
        assert_eq!(passages[2].text, "Third?");
    }

    #[test]
    fn sentence_splitter_keeps_trailing_fragment() {
        let parent = doc("Complete sentence. trailing fragment without terminator");
        let passages = SentenceSplitter::new().split(std::slice::from_ref(&parent)).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[1].text, "trailing fragment without terminator");
    }

    #[test]
    fn decimal_points_do_not_end_sentences() {
        let parent = doc("The dose is 2.5 mg per day. Take with food.");
        let passages = SentenceSplitter::new().split(std::slice::from_ref(&parent)).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "The dose is 2.5 mg per day.");
    }

    #[test]
    fn passages_carry_lineage_metadata() {
        let parent = doc("One. Two. Three.");
        let passages = SentenceSplitter::new().split(std::slice::from_ref(&parent)).unwrap();

        for (i, p) in passages.iter().enumerate() {
            assert_eq!(p.parent_id(), Some(parent.id.as_str()));
            assert_eq!(p.chunk_id(), Some(i as u64));
            assert_eq!(p.source(), Some("a.pdf"));
            assert_ne!(p.id, parent.id);
        }
    }

    #[test]
    fn chunk_ids_restart_per_parent_in_a_batch() {
        let a = doc("One. Two.");
        let b = doc("Three. Four. Five.");
        let passages = SentenceSplitter::new().split(&[a.clone(), b.clone()]).unwrap();

        let a_ids: Vec<u64> =
            passages.iter().filter(|p| p.parent_id() == Some(a.id.as_str())).map(|p| p.chunk_id().unwrap()).collect();
        let b_ids: Vec<u64> =
            passages.iter().filter(|p| p.parent_id() == Some(b.id.as_str())).map(|p| p.chunk_id().unwrap()).collect();

        assert_eq!(a_ids, vec![0, 1]);
        assert_eq!(b_ids, vec![0, 1, 2]);
    }

    #[test]
    fn recursive_splitter_respects_chunk_size_on_paragraphs() {
        let text = "para one\n\npara two\n\npara three";
        let parent = doc(text);
        let passages =
            RecursiveCharacterSplitter::new(20, 5).split(std::slice::from_ref(&parent)).unwrap();

        assert!(!passages.is_empty());
        for p in &passages {
            assert!(p.text.len() <= 20, "chunk too long: {:?}", p.text);
        }
    }

    #[test]
    fn recursive_splitter_falls_back_to_character_cuts() {
        let parent = doc(&"x".repeat(55));
        let passages =
            RecursiveCharacterSplitter::new(20, 5).split(std::slice::from_ref(&parent)).unwrap();

        assert!(passages.len() >= 3);
        assert!(passages.iter().all(|p| p.text.len() <= 20));
        // Overlap: consecutive character-level chunks share a 5-char seam.
        assert!(passages[0].text.ends_with(&passages[1].text[..5]));
    }

    #[test]
    fn recursive_splitter_skips_empty_documents() {
        let parent = doc("");
        let passages =
            RecursiveCharacterSplitter::new(20, 5).split(std::slice::from_ref(&parent)).unwrap();
        assert!(passages.is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let parent = doc("short");
        let passages =
            RecursiveCharacterSplitter::new(200, 20).split(std::slice::from_ref(&parent)).unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "short");
        assert_eq!(passages[0].chunk_id(), Some(0));
    }
}
