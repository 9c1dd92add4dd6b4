//! Query orchestrator: retrieve → format context → generate → shape answer.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::diag::DiagnosticLog;
use crate::document::Document;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::retriever::{format_context, Retriever, UNKNOWN_SOURCE};

/// Maximum characters of passage text kept in a citation preview.
const PREVIEW_CHARS: usize = 150;

/// A citation entry in a [`ChatAnswer`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceRef {
    /// Passage preview, truncated to 150 characters plus an ellipsis marker.
    pub text: String,
    /// Origin filename, or `"Unknown source"` when absent.
    pub source: String,
    /// Page metadata, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
}

impl SourceRef {
    fn from_document(doc: &Document) -> Self {
        let preview: String = doc.text.chars().take(PREVIEW_CHARS).collect();
        Self {
            text: format!("{preview}..."),
            source: doc.source().unwrap_or(UNKNOWN_SOURCE).to_string(),
            page: doc.page(),
        }
    }
}

/// The answer payload handed to the HTTP boundary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatAnswer {
    /// The generated answer text.
    pub message: String,
    /// Citations for the retrieved passages, in retrieval order.
    #[serde(rename = "source")]
    pub sources: Vec<SourceRef>,
}

/// The query orchestrator.
///
/// Runs retrieve → format context → complete for one request. Any failure
/// surfaces as a single error for the whole call; no partial answer is
/// returned.
pub struct QueryPipeline {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    log: DiagnosticLog,
}

impl QueryPipeline {
    /// Create a query pipeline retrieving `top_k` passages per question.
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        log: DiagnosticLog,
    ) -> Self {
        Self { retriever, generator, top_k, log }
    }

    /// Answer a query, grounding the generation in retrieved passages.
    ///
    /// An empty retrieval still reaches the generation provider with an
    /// empty context; the model is expected to say it cannot answer.
    pub async fn answer(&self, query: &str, response_format: &str) -> Result<ChatAnswer> {
        let documents = self.retriever.retrieve(query, self.top_k).await.map_err(|e| {
            error!(error = %e, "retrieval phase failed");
            self.log.error(format!("retrieval phase failed: {e}"));
            RagError::Pipeline(format!("retrieval phase failed: {e}"))
        })?;

        let context = format_context(&documents);

        let message = self
            .generator
            .complete(query, &context, response_format)
            .await
            .map_err(|e| {
                error!(provider = self.generator.name(), error = %e, "generation phase failed");
                self.log.error(format!("generation phase failed: {e}"));
                RagError::Pipeline(format!("generation phase failed: {e}"))
            })?;

        let sources = documents.iter().map(SourceRef::from_document).collect();
        info!(source_count = documents.len(), "answered query");

        Ok(ChatAnswer { message, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use serde_json::json;

    fn doc_with(text: &str, source: Option<&str>, page: Option<u64>) -> Document {
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
    fn preview_truncates_to_150_chars_with_marker() {
        let long = "x".repeat(400);
        let source = SourceRef::from_document(&doc_with(&long, Some("a.pdf"), Some(1)));
        assert_eq!(source.text.chars().count(), 153);
        assert!(source.text.ends_with("..."));
    }

    #[test]
    fn short_text_still_gets_marker() {
        let source = SourceRef::from_document(&doc_with("short", Some("a.pdf"), None));
        assert_eq!(source.text, "short...");
    }

    #[test]
    fn missing_source_defaults() {
        let source = SourceRef::from_document(&doc_with("t", None, None));
        assert_eq!(source.source, "Unknown source");
        assert_eq!(source.page, None);
    }

    #[test]
    fn answer_serializes_to_boundary_payload() {
        let answer = ChatAnswer {
            message: "hi".to_string(),
            sources: vec![SourceRef { text: "t...".to_string(), source: "a.pdf".to_string(), page: Some(2) }],
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["message"], "hi");
        assert_eq!(json["source"][0]["source"], "a.pdf");
        assert_eq!(json["source"][0]["page"], 2);
    }
}
