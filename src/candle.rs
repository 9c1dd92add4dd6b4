//! On-device embedding pipeline using Candle.
//!
//! Runs `sentence-transformers/all-MiniLM-L6-v2` (384 dimensions, BERT
//! architecture) locally. Model files are fetched from the HuggingFace Hub
//! on first use; the loaded model is cached behind a single-flight guard so
//! concurrent first callers share one initialization. Only available with
//! the `local-embedding` feature.

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::embedding::{l2_normalize, EmbeddingProvider};
use crate::error::{RagError, Result};

const PROVIDER: &str = "Candle";

/// Default model identifier on the HuggingFace Hub.
const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding dimension for all-MiniLM-L6-v2.
const DEFAULT_DIMENSIONS: usize = 384;

/// Maximum sequence length.
const MAX_TOKENS: usize = 512;

fn embed_err(message: impl Into<String>) -> RagError {
    RagError::Embedding { provider: PROVIDER.to_string(), message: message.into() }
}

struct Encoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl Encoder {
    async fn load(model_id: &str, device: Device) -> Result<Self> {
        info!(model = model_id, device = ?device, "loading embedding model");

        let api = Api::new().map_err(|e| embed_err(format!("hub API init failed: {e}")))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| embed_err(format!("tokenizer download failed: {e}")))?;
        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| embed_err(format!("config download failed: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| embed_err(format!("weights download failed: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embed_err(format!("tokenizer load failed: {e}")))?;

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| embed_err(format!("config read failed: {e}")))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| embed_err(format!("config parse failed: {e}")))?;

        // SAFETY: the safetensors file comes from the Hub and is mapped
        // read-only for the lifetime of the model.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| embed_err(format!("weights load failed: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| embed_err(format!("model build failed: {e}")))?;

        info!(model = model_id, "embedding model ready");
        Ok(Self { model, tokenizer, device })
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_err(format!("tokenization failed: {e}")))?;

        let ids: Vec<u32> = encoding.get_ids().iter().take(MAX_TOKENS).copied().collect();
        let len = ids.len();
        let token_type_ids = vec![0u32; len];

        let input_ids = Tensor::from_vec(ids, (1, len), &self.device)
            .map_err(|e| embed_err(format!("input tensor failed: {e}")))?;
        let token_type_ids = Tensor::from_vec(token_type_ids, (1, len), &self.device)
            .map_err(|e| embed_err(format!("token type tensor failed: {e}")))?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| embed_err(format!("forward pass failed: {e}")))?;

        // Mean-pool the per-token vectors (all positions are real tokens
        // here, so no attention mask weighting is needed).
        let pooled = output
            .mean(1)
            .map_err(|e| embed_err(format!("pooling failed: {e}")))?;

        let mut vector = pooled
            .get(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| embed_err(format!("tensor conversion failed: {e}")))?;
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// An [`EmbeddingProvider`] running a BERT pipeline on-device via Candle.
///
/// The model is loaded lazily on the first `embed` call and reused across
/// calls; a failed load leaves the cache empty so a later call may retry.
pub struct CandleEmbeddingProvider {
    encoder: OnceCell<Encoder>,
    model_id: String,
    dimensions: usize,
    device: Device,
}

impl CandleEmbeddingProvider {
    /// Create a provider for the default `all-MiniLM-L6-v2` model, using
    /// CUDA when available and CPU otherwise.
    pub fn new() -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        Self {
            encoder: OnceCell::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            device,
        }
    }

    /// Create a provider for a specific Hub model and dimensionality.
    pub fn with_model(model_id: impl Into<String>, dimensions: usize) -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        Self { encoder: OnceCell::new(), model_id: model_id.into(), dimensions, device }
    }

    async fn encoder(&self) -> Result<&Encoder> {
        self.encoder.get_or_try_init(|| Encoder::load(&self.model_id, self.device.clone())).await
    }
}

impl Default for CandleEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for CandleEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding text");
        let encoder = self.encoder().await?;
        let vector = encoder.encode(text)?;
        if vector.len() != self.dimensions {
            return Err(embed_err(format!(
                "model returned {} dimensions, expected {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
