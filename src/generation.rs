//! Generation provider trait and the shared grounding prompt.

use async_trait::async_trait;

use crate::error::Result;

/// Reference sources the model may consult when the retrieved context is
/// insufficient.
pub const DEFAULT_FALLBACK_SOURCES: [&str; 2] = [
    "https://www.ncbi.nlm.nih.gov/books/NBK554776/",
    "https://opencovidjournal.com/VOLUME/4/ELOCATOR/e26669587296962/FULLTEXT/",
];

/// A provider that turns a query and retrieved context into an answer.
///
/// Generation itself is stateless request/response; engine-backed variants
/// may cache a lazily initialized engine between calls. Retry behavior is
/// backend-specific and exhausted before an error surfaces.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce an answer grounded in `context`, rendered as `response_format`.
    async fn complete(&self, query: &str, context: &str, response_format: &str) -> Result<String>;

    /// Backend name used in error reporting.
    fn name(&self) -> &'static str;
}

/// The fixed instruction template wrapped around every completion request.
///
/// Instructs the model to answer only from the provided context, fall back to
/// the configured reference sources when the context is insufficient, state
/// explicitly when it cannot answer, and render the answer in the requested
/// format with section headings.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    fallback_sources: Vec<String>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            fallback_sources: DEFAULT_FALLBACK_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PromptTemplate {
    /// Create a template with custom fallback reference sources.
    pub fn with_fallback_sources(sources: Vec<String>) -> Self {
        Self { fallback_sources: sources }
    }

    /// Render the full prompt for a query, context, and response format.
    pub fn render(&self, query: &str, context: &str, response_format: &str) -> String {
        let sources = self.fallback_sources.join(", ");
        format!(
            "<s>[INST] You are a helpful assistant with given context and question:\n\
             \n\
             Context: {context}\n\
             \n\
             Question: {query}\n\
             \n\
             Following are the instructions for your response:\n\
             1. Answer the question based solely on the provided context.\n\
             2. If the context doesn't contain the information needed to answer the question, use {sources} as sources of information.\n\
             3. If you are not able to answer, say that you don't have enough information.\n\
             \n\
             Write the response as a {response_format} text with fully formatted headings.\n\
             [/INST]</s>"
        )
    }
}
