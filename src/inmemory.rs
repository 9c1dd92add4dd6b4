//! In-memory vector store backed by a `HashMap`.
//!
//! [`InMemoryVectorStore`] is a zero-dependency backend suitable for
//! development and tests. Unlike a remote store it enforces the collection
//! dimension invariant itself, so mismatches fail the same way they would
//! against a real backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{SearchResult, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

const BACKEND: &str = "in-memory";

struct Collection {
    dimensions: usize,
    metric: DistanceMetric,
    records: HashMap<String, VectorRecord>,
}

/// An in-memory vector store with exact nearest-neighbor search.
///
/// Collections live in a `HashMap` behind a `tokio::sync::RwLock`; the write
/// lock in [`ensure_collection`](VectorStore::ensure_collection) makes the
/// first-call race safe.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors of equal dimension.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Dot => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        // Negated so that "higher is better" holds for every metric.
        DistanceMetric::Euclid => {
            -a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, metric, records: HashMap::new() });
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| RagError::Upsert {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        // Validate every record before inserting any, so a dimension
        // mismatch leaves the store unchanged.
        for record in records {
            if record.vector.len() != target.dimensions {
                return Err(RagError::Upsert {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "vector dimension {} does not match collection dimension {} (record '{}')",
                        record.vector.len(),
                        target.dimensions,
                        record.id
                    ),
                });
            }
        }

        for record in records {
            target.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| RagError::Search {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        if vector.len() != target.dimensions {
            return Err(RagError::Search {
                backend: BACKEND.to_string(),
                message: format!(
                    "query dimension {} does not match collection dimension {}",
                    vector.len(),
                    target.dimensions
                ),
            });
        }

        let mut scored: Vec<SearchResult> = target
            .records
            .values()
            .map(|record| SearchResult {
                id: Some(record.id.clone()),
                text: record.payload.text.clone(),
                metadata: record.payload.metadata.clone(),
                score: score(target.metric, &record.vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Metadata, Payload};

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            payload: Payload { text: format!("text {id}"), metadata: Metadata::new() },
        }
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        store.upsert("docs", &[record("a", vec![1.0, 0.0])]).await.unwrap();
        // A second ensure must not wipe existing records.
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        let results = store.search("docs", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_on_upsert_leaves_store_unchanged() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();

        let batch = [record("ok", vec![1.0, 0.0]), record("bad", vec![1.0, 0.0, 0.0])];
        let err = store.upsert("docs", &batch).await.unwrap_err();
        assert!(matches!(err, RagError::Upsert { .. }));

        // Not even the valid record of the failed batch was inserted.
        let results = store.search("docs", &[1.0, 0.0], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_on_search_is_an_error() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        let err = store.search("docs", &[1.0, 0.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, RagError::Search { .. }));
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        store.upsert("docs", &[record("a", vec![1.0, 0.0])]).await.unwrap();

        let mut replacement = record("a", vec![0.0, 1.0]);
        replacement.payload.text = "replaced".to_string();
        store.upsert("docs", &[replacement]).await.unwrap();

        let results = store.search("docs", &[0.0, 1.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "replaced");
    }

    #[tokio::test]
    async fn zero_limit_returns_empty() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        store.upsert("docs", &[record("a", vec![1.0, 0.0])]).await.unwrap();
        let results = store.search("docs", &[1.0, 0.0], 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_orders_by_descending_similarity() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        store
            .upsert(
                "docs",
                &[
                    record("far", vec![0.0, 1.0]),
                    record("near", vec![1.0, 0.0]),
                    record("mid", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search("docs", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id.as_deref(), Some("near"));
        assert_eq!(results[1].id.as_deref(), Some("mid"));
    }
}
