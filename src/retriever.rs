//! Query-time retrieval: embed, search, and render grounding context.

use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{Document, META_PAGE};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::{DistanceMetric, VectorStore};

/// Separator between rendered context blocks.
const BLOCK_SEPARATOR: &str = "\n---\n\n";

/// Placeholder rendered when a document has no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "Unknown source";
/// Placeholder rendered when a document has no `page` metadata.
pub const UNKNOWN_PAGE: &str = "Unknown page";

/// Embeds queries and maps vector search results back into documents.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    distance: DistanceMetric,
}

impl Retriever {
    /// Create a retriever over the given embedder, store, and collection.
    ///
    /// The collection is created with cosine similarity if it does not
    /// exist yet; use [`with_distance`](Self::with_distance) to match a
    /// collection configured with another metric.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            distance: DistanceMetric::Cosine,
        }
    }

    /// Set the distance metric used when the collection has to be created.
    pub fn with_distance(mut self, metric: DistanceMetric) -> Self {
        self.distance = metric;
        self
    }

    /// Retrieve the `k` most relevant documents for a query.
    ///
    /// Embeds the query, searches the vector store, and reconstitutes each
    /// result as a Document (with a fresh id when the store returned none).
    /// The collection is created on first use, so a query issued before any
    /// ingestion yields an empty sequence, not an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let embedding = self.embedder.embed(query).await?;

        self.store
            .ensure_collection(&self.collection, self.embedder.dimensions(), self.distance)
            .await?;
        debug!(collection = %self.collection, k, "searching vector store");

        let results = self.store.search(&self.collection, &embedding, k).await?;
        info!(result_count = results.len(), "retrieved documents for query");

        Ok(results.into_iter().map(|r| r.into_document()).collect())
    }
}

/// Render documents as the grounding context string.
///
/// Each document becomes a labeled block
/// `"[Document i] From: <source>, Page: <page>\n<text>\n"` (1-based `i`,
/// input order preserved), joined by a fixed separator. Missing metadata
/// renders as [`UNKNOWN_SOURCE`] / [`UNKNOWN_PAGE`]. Passage text is never
/// truncated here; previews are a caller concern.
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let source = doc.source().unwrap_or(UNKNOWN_SOURCE);
            let page = doc
                .metadata
                .get(META_PAGE)
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| UNKNOWN_PAGE.to_string());
            format!("[Document {}] From: {source}, Page: {page}\n{}\n", i + 1, doc.text)
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use serde_json::json;

    fn doc(text: &str, source: Option<&str>, page: Option<u64>) -> Document {
        let mut metadata = Metadata::new();
        if let Some(s) = source {
            metadata.insert("source".to_string(), json!(s));
        }
        if let Some(p) = page {
            metadata.insert("page".to_string(), json!(p));
        }
        Document::new(text, metadata)
    }

    #[test]
    fn formats_single_document_exactly() {
        let rendered = format_context(&[doc("hello", Some("a.pdf"), Some(3))]);
        assert_eq!(rendered, "[Document 1] From: a.pdf, Page: 3\nhello\n");
    }

    #[test]
    fn joins_blocks_with_separator_in_input_order() {
        let rendered = format_context(&[
            doc("first", Some("a.pdf"), Some(1)),
            doc("second", Some("b.pdf"), Some(2)),
        ]);
        assert_eq!(
            rendered,
            "[Document 1] From: a.pdf, Page: 1\nfirst\n\n---\n\n[Document 2] From: b.pdf, Page: 2\nsecond\n"
        );
    }

    #[test]
    fn missing_metadata_renders_placeholders() {
        let rendered = format_context(&[doc("text", None, None)]);
        assert_eq!(rendered, "[Document 1] From: Unknown source, Page: Unknown page\ntext\n");
    }

    #[test]
    fn page_zero_is_rendered_not_treated_as_missing() {
        let rendered = format_context(&[doc("text", Some("a.pdf"), Some(0))]);
        assert_eq!(rendered, "[Document 1] From: a.pdf, Page: 0\ntext\n");
    }

    #[test]
    fn empty_input_renders_empty_context() {
        assert_eq!(format_context(&[]), "");
    }
}
