//! Property tests for in-memory vector store search ordering.

use ragdoc::document::{Metadata, Payload, VectorRecord};
use ragdoc::inmemory::InMemoryVectorStore;
use ragdoc::vectorstore::{DistanceMetric, VectorStore};

use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a record with a normalized embedding.
fn arb_record(dim: usize) -> impl Strategy<Value = VectorRecord> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, vector)| VectorRecord {
            id,
            vector,
            payload: Payload { text, metadata: Metadata::new() },
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any set of stored records, searching returns results ordered by
    /// descending cosine similarity, bounded by the requested limit.
    #[test]
    fn results_ordered_descending_and_bounded_by_limit(
        records in proptest::collection::vec(arb_record(16), 1..20),
        query in arb_normalized_embedding(16),
        limit in 1usize..25,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (results, unique_count) = rt.block_on(async {
            let store = InMemoryVectorStore::new();
            store.ensure_collection("test", 16, DistanceMetric::Cosine).await.unwrap();

            // Deduplicate records by id to avoid upsert overwriting
            let mut deduped: std::collections::HashMap<String, VectorRecord> =
                std::collections::HashMap::new();
            for record in &records {
                deduped.entry(record.id.clone()).or_insert_with(|| record.clone());
            }
            let unique: Vec<VectorRecord> = deduped.into_values().collect();
            let count = unique.len();

            store.upsert("test", &unique).await.unwrap();
            let results = store.search("test", &query, limit).await.unwrap();
            (results, count)
        });

        prop_assert!(results.len() <= limit);
        prop_assert!(results.len() <= unique_count);

        for window in results.windows(2) {
            prop_assert!(
                window[0].score >= window[1].score,
                "results not in descending order: {} < {}",
                window[0].score,
                window[1].score,
            );
        }
    }

    /// Searching with limit 0 always returns an empty result set.
    #[test]
    fn zero_limit_always_empty(
        records in proptest::collection::vec(arb_record(8), 0..10),
        query in arb_normalized_embedding(8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let results = rt.block_on(async {
            let store = InMemoryVectorStore::new();
            store.ensure_collection("test", 8, DistanceMetric::Cosine).await.unwrap();
            store.upsert("test", &records).await.ok();
            store.search("test", &query, 0).await.unwrap()
        });
        prop_assert!(results.is_empty());
    }
}
