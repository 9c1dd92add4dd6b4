//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using the
//! [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC. Only
//! available with the `qdrant` feature.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, OptimizersConfigDiffBuilder, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload as QdrantPayload, Qdrant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::document::{Metadata, SearchResult, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

const BACKEND: &str = "qdrant";

/// Default gRPC endpoint for a local Qdrant instance.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections are created with a fixed optimizer configuration
/// (`default_segment_number = 2`, `replication_factor = 1`); metadata is
/// stored in the point payload under a `metadata` key next to `text`.
pub struct QdrantVectorStore {
    client: Qdrant,
    // Serializes the exists-check/create sequence so concurrent first
    // callers cannot both attempt creation.
    ensure_guard: Mutex<()>,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(|e| RagError::Config(e.to_string()))?;
        Ok(Self { client, ensure_guard: Mutex::new(()) })
    }

    /// Create a new Qdrant vector store with an API key.
    pub fn with_api_key(url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key.into())
            .build()
            .map_err(|e| RagError::Config(e.to_string()))?;
        Ok(Self { client, ensure_guard: Mutex::new(()) })
    }

    /// Create a new Qdrant vector store from `QDRANT_URL` and, when set,
    /// `QDRANT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string());
        match std::env::var("QDRANT_API_KEY") {
            Ok(key) if !key.is_empty() => Self::with_api_key(&url, key),
            _ => Self::new(&url),
        }
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client, ensure_guard: Mutex::new(()) }
    }

    fn search_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::Search { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn upsert_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::Upsert { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

fn distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Euclid => Distance::Euclid,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        let _guard = self.ensure_guard.lock().await;

        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RagError::Config(format!("listing collections failed: {e}")))?;
        if collections.collections.iter().any(|c| c.name == name) {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, distance(metric)))
                    .optimizers_config(OptimizersConfigDiffBuilder::default().default_segment_number(2))
                    .replication_factor(1),
            )
            .await
            .map_err(|e| RagError::Config(format!("creating collection '{name}' failed: {e}")))?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(records.len());
        for record in records {
            let mut payload_map = serde_json::Map::new();
            payload_map.insert(
                "text".to_string(),
                serde_json::Value::String(record.payload.text.clone()),
            );
            payload_map.insert(
                "metadata".to_string(),
                serde_json::Value::Object(
                    record.payload.metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                ),
            );

            let payload =
                QdrantPayload::try_from(serde_json::Value::Object(payload_map)).map_err(|e| {
                    RagError::Upsert {
                        backend: BACKEND.to_string(),
                        message: format!("payload conversion failed for record '{}': {e}", record.id),
                    }
                })?;

            points.push(PointStruct::new(record.id.clone(), record.vector.clone(), payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::upsert_err)?;

        debug!(collection, count = records.len(), "upserted records to qdrant");
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

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::search_err)?;

        debug!(collection, count = response.result.len(), "qdrant search returned");

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored.id.as_ref().and_then(|pid| match &pid.point_id_options {
                    Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                    Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                    None => None,
                });

                let text =
                    scored.payload.get("text").and_then(Self::extract_string).unwrap_or_default();

                let metadata: Metadata = scored
                    .payload
                    .get("metadata")
                    .and_then(|v| match &v.kind {
                        Some(Kind::StructValue(s)) => Some(
                            s.fields
                                .iter()
                                .map(|(k, v)| (k.clone(), qdrant_value_to_json(v)))
                                .collect(),
                        ),
                        _ => None,
                    })
                    .unwrap_or_else(HashMap::new);

                SearchResult { id, text, metadata, score: scored.score }
            })
            .collect();

        Ok(results)
    }
}

/// Convert a Qdrant payload value back into JSON metadata.
fn qdrant_value_to_json(value: &QdrantValue) -> serde_json::Value {
    match &value.kind {
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(*i),
        Some(Kind::DoubleValue(d)) => {
            serde_json::Number::from_f64(*d).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
        }
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields.iter().map(|(k, v)| (k.clone(), qdrant_value_to_json(v))).collect(),
        ),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}
