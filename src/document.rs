//! Data types for documents, stored vector records, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Key-value metadata attached to documents and passages.
///
/// Values are JSON so numeric fields (`page`, `chunk_id`) and string fields
/// (`source`, `title`, `parent_id`) coexist alongside provider-specific keys.
pub type Metadata = HashMap<String, Value>;

/// Metadata key for the origin filename.
pub const META_SOURCE: &str = "source";
/// Metadata key for the page count (whole document) or page number (passage).
pub const META_PAGE: &str = "page";
/// Metadata key for the document title.
pub const META_TITLE: &str = "title";
/// Metadata key for a passage's 0-based position within its parent.
pub const META_CHUNK_ID: &str = "chunk_id";
/// Metadata key linking a passage back to the document it was split from.
pub const META_PARENT_ID: &str = "parent_id";

/// A source document or passage with text content and lineage metadata.
///
/// Whole documents come out of ingestion with `source`, `page`, and `title`
/// metadata; passages produced by a [`Splitter`](crate::splitter::Splitter)
/// additionally carry `parent_id` and `chunk_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a freshly generated id.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self { id: Uuid::new_v4().to_string(), text: text.into(), metadata }
    }

    /// The origin filename, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(Value::as_str)
    }

    /// The page count or page number, if recorded.
    pub fn page(&self) -> Option<u64> {
        self.metadata.get(META_PAGE).and_then(Value::as_u64)
    }

    /// The parent document id, if this is a passage.
    pub fn parent_id(&self) -> Option<&str> {
        self.metadata.get(META_PARENT_ID).and_then(Value::as_str)
    }

    /// The 0-based position among sibling passages, if this is a passage.
    pub fn chunk_id(&self) -> Option<u64> {
        self.metadata.get(META_CHUNK_ID).and_then(Value::as_u64)
    }
}

/// The payload stored alongside a vector: the passage text plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    /// The passage text.
    pub text: String,
    /// Metadata inherited from the passage.
    pub metadata: Metadata,
}

/// The stored form of an embedded passage.
///
/// Never mutated in place; re-upserting with the same id replaces the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Unique identifier, reused as the point id in the vector store.
    pub id: String,
    /// The embedding vector. Length must match the collection dimension.
    pub vector: Vec<f32>,
    /// Text and metadata attached to the record.
    pub payload: Payload,
}

impl VectorRecord {
    /// Build a record from an embedded passage.
    pub fn from_document(document: &Document, vector: Vec<f32>) -> Self {
        Self {
            id: document.id.clone(),
            vector,
            payload: Payload {
                text: document.text.clone(),
                metadata: document.metadata.clone(),
            },
        }
    }
}

/// A retrieved payload paired with a similarity score.
///
/// Score semantics follow the collection's distance metric (cosine similarity
/// in the default configuration); results are ordered descending by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The stored record id, when the backend returns one.
    pub id: Option<String>,
    /// The passage text.
    pub text: String,
    /// Metadata stored with the passage.
    pub metadata: Metadata,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

impl SearchResult {
    /// Reconstitute a Document-shaped record, generating a fresh id if the
    /// store did not return one.
    pub fn into_document(self) -> Document {
        Document {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            text: self.text,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_metadata_accessors() {
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), json!("report.pdf"));
        metadata.insert(META_PAGE.to_string(), json!(12));
        let doc = Document::new("body", metadata);

        assert_eq!(doc.source(), Some("report.pdf"));
        assert_eq!(doc.page(), Some(12));
        assert_eq!(doc.parent_id(), None);
        assert_eq!(doc.chunk_id(), None);
    }

    #[test]
    fn search_result_without_id_gets_fresh_one() {
        let result = SearchResult {
            id: None,
            text: "hello".to_string(),
            metadata: Metadata::new(),
            score: 0.9,
        };
        let doc = result.into_document();
        assert!(!doc.id.is_empty());
        assert_eq!(doc.text, "hello");
    }

    #[test]
    fn search_result_keeps_store_id() {
        let result = SearchResult {
            id: Some("abc".to_string()),
            text: "hello".to_string(),
            metadata: Metadata::new(),
            score: 0.9,
        };
        assert_eq!(result.into_document().id, "abc");
    }
}
