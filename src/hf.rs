//! HuggingFace hosted inference backends.
//!
//! [`HfEmbeddingProvider`] calls the feature-extraction pipeline and
//! [`HfGenerationProvider`] calls the text-generation pipeline, both via
//! `reqwest`. Only available with the `hf` feature.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::embedding::{l2_normalize, mean_pool, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::{GenerationProvider, PromptTemplate};
use crate::retry::RetryPolicy;

const PROVIDER: &str = "HuggingFace";

/// Base URL of the hosted inference API.
const HF_API_BASE: &str = "https://api-inference.huggingface.co";

/// Default embedding model (384 dimensions).
const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Default text-generation model.
const DEFAULT_GENERATION_MODEL: &str = "mistralai/Mistral-Small-3.1-24B-Instruct-2503";

fn api_token_from_env() -> Result<String> {
    std::env::var("HUGGINGFACE_API_KEY").map_err(|_| RagError::Config(
        "HUGGINGFACE_API_KEY environment variable not set".to_string(),
    ))
}

// ── Embedding ──────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the HuggingFace feature-extraction
/// pipeline.
///
/// The pipeline returns either an already-pooled sentence vector or one
/// vector per token, depending on the model; per-token outputs are
/// mean-pooled. All outputs are L2-normalized.
pub struct HfEmbeddingProvider {
    client: reqwest::Client,
    api_token: String,
    model: String,
    dimensions: usize,
}

impl HfEmbeddingProvider {
    /// Create a new provider with the given API token and the default
    /// `all-MiniLM-L6-v2` model.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RagError::Embedding {
                provider: PROVIDER.to_string(),
                message: "API token must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_token,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    /// Create a new provider using the `HUGGINGFACE_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_token_from_env()?)
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

/// Feature-extraction output: pooled per sentence or one vector per token.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionOutput {
    Pooled(Vec<f32>),
    PerToken(Vec<Vec<f32>>),
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let url = format!("{HF_API_BASE}/pipeline/feature-extraction/{}", self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": text }))
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

        let output: FeatureExtractionOutput = response
            .json()
            .await
            .map_err(|e| self.embed_err(format!("failed to parse response: {e}")))?;

        let mut vector = match output {
            FeatureExtractionOutput::Pooled(v) => v,
            FeatureExtractionOutput::PerToken(tokens) => mean_pool(&tokens),
        };
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

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self { max_new_tokens: 200, temperature: 0.1, top_p: 0.95, repetition_penalty: 1.15 }
    }
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// A [`GenerationProvider`] backed by the HuggingFace text-generation
/// pipeline.
///
/// Each call makes up to 3 total attempts with exponential backoff
/// (1s, 2s) before raising an error that names the attempt count.
pub struct HfGenerationProvider {
    client: reqwest::Client,
    api_token: String,
    model: String,
    template: PromptTemplate,
    retry: RetryPolicy,
    parameters: GenerationParameters,
}

impl HfGenerationProvider {
    /// Create a new provider with the given API token and the default model.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RagError::Generation {
                provider: PROVIDER.to_string(),
                message: "API token must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_token,
            model: DEFAULT_GENERATION_MODEL.to_string(),
            template: PromptTemplate::default(),
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
            parameters: GenerationParameters::default(),
        })
    }

    /// Create a new provider using the `HUGGINGFACE_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        Self::new(api_token_from_env()?)
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

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn generate_once(&self, prompt: &str) -> std::result::Result<String, String> {
        let url = format!("{HF_API_BASE}/models/{}", self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": prompt, "parameters": self.parameters }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {body}"));
        }

        let outputs: Vec<GeneratedText> =
            response.json().await.map_err(|e| format!("failed to parse response: {e}"))?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or_else(|| "API returned empty response".to_string())
    }
}

#[async_trait]
impl GenerationProvider for HfGenerationProvider {
    async fn complete(&self, query: &str, context: &str, response_format: &str) -> Result<String> {
        let prompt = self.template.render(query, context, response_format);
        debug!(provider = PROVIDER, model = %self.model, "generating completion");

        self.retry.run(|| self.generate_once(&prompt)).await.map_err(|exhausted| {
            error!(provider = PROVIDER, attempts = exhausted.attempts, "generation failed");
            RagError::Generation { provider: PROVIDER.to_string(), message: exhausted.to_string() }
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
