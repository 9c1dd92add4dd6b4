//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{SearchResult, VectorRecord};
use crate::error::Result;

/// Distance metric for a collection, fixed at first creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine similarity (the default).
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean distance.
    Euclid,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`VectorRecord`]s. A
/// collection's dimension and distance metric are chosen at first creation
/// and never migrated; every vector upserted into or searched against it
/// must have exactly that dimension.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ensure a named collection exists, creating it if absent.
    ///
    /// Idempotent, and safe when concurrent first callers race: exactly one
    /// creation happens.
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()>;

    /// Insert or replace records by id.
    ///
    /// Returns once the store acknowledges durability, not fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Upsert`](crate::RagError::Upsert) on backend
    /// failure or dimension mismatch; on mismatch the store is left unchanged.
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `limit` nearest records with payloads, best-first.
    ///
    /// A `limit` of zero returns an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Search`](crate::RagError::Search) on backend
    /// failure or dimension mismatch.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;
}
