//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns text into a fixed-length embedding vector.
///
/// Implementations wrap specific backends (on-device candle pipeline, hosted
/// HuggingFace inference, Gemini embedding API) behind a unified async
/// interface. Backends are selected once per deployment and not mixed within
/// a collection, since their dimensions differ.
///
/// Providers perform no retries; retry policy lives at the orchestrator
/// boundary.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an L2-normalized embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override if the backend supports native
    /// batching.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The dimensionality of embeddings produced by this provider.
    ///
    /// Fixed per provider; the vector store collection is created with this
    /// dimension.
    fn dimensions(&self) -> usize;

    /// Backend name used in error reporting.
    fn name(&self) -> &'static str;
}

/// L2-normalize a vector in place. A zero vector is left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Mean-pool per-token vectors into one sentence vector.
///
/// Returns an empty vector for empty input.
pub fn mean_pool(token_vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = token_vectors.first() else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; first.len()];
    for token in token_vectors {
        for (slot, value) in pooled.iter_mut().zip(token) {
            *slot += value;
        }
    }
    let count = token_vectors.len() as f32;
    for slot in pooled.iter_mut() {
        *slot /= count;
    }
    pooled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn mean_pool_averages_token_vectors() {
        let tokens = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(mean_pool(&tokens), vec![2.0, 3.0]);
    }

    #[test]
    fn mean_pool_of_empty_input_is_empty() {
        assert!(mean_pool(&[]).is_empty());
    }
}
