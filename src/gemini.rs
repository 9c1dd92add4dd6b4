//! Gemini hosted API backends.
//!
//! [`GeminiEmbeddingProvider`] calls the `embedContent` endpoint and
//! [`GeminiGenerationProvider`] calls `generateContent`, both directly via
//! `reqwest`. Only available with the `gemini` feature.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::embedding::{l2_normalize, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::{GenerationProvider, PromptTemplate};

const PROVIDER: &str = "Gemini";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default embedding model (768 dimensions).
const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// Default generation model.
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

fn api_key_from_env() -> Result<String> {
    std::env::var("GEMINI_API_KEY")
        .map_err(|_| RagError::Config("GEMINI_API_KEY environment variable not set".to_string()))
}

// ── Embedding ──────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider with the given API key and the default
    /// `embedding-001` model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Embedding {
                provider: PROVIDER.to_string(),
                message: "API key must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    /// Create a new provider using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model and its embedding dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    fn embed_err(&self, message: String) -> RagError {
        RagError::Embedding { provider: PROVIDER.to_string(), message }
    }
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let url = format!("{GEMINI_API_BASE}/models/{}:embedContent", self.model);
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                self.embed_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(self.embed_err(format!("API returned {status}: {body}")));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| self.embed_err(format!("failed to parse response: {e}")))?;

        let mut vector = parsed.embedding.values;
        if vector.len() != self.dimensions {
            return Err(self.embed_err(format!(
                "model returned {} dimensions, expected {}",
                vector.len(),
                self.dimensions
            )));
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

// ── Generation ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// A [`GenerationProvider`] backed by the Gemini `generateContent` API.
///
/// Single attempt per call; failures are logged and propagated without
/// retry.
pub struct GeminiGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    template: PromptTemplate,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiGenerationProvider {
    /// Create a new provider with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                provider: PROVIDER.to_string(),
                message: "API key must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_GENERATION_MODEL.to_string(),
            template: PromptTemplate::default(),
            temperature: 0.7,
            max_output_tokens: 5024,
        })
    }

    /// Create a new provider using the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    fn generation_err(&self, message: String) -> RagError {
        RagError::Generation { provider: PROVIDER.to_string(), message }
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    async fn complete(&self, query: &str, context: &str, response_format: &str) -> Result<String> {
        let prompt = self.template.render(query, context, response_format);
        debug!(provider = PROVIDER, model = %self.model, "generating completion");

        let url = format!("{GEMINI_API_BASE}/models/{}:generateContent", self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "generation request failed");
                self.generation_err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "generation API error");
            return Err(self.generation_err(format!("API returned {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.generation_err(format!("failed to parse response: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| self.generation_err("API returned no candidates".to_string()))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
