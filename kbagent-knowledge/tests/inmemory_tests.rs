//! Property tests for search bounds over the in-memory vector store.

use std::collections::HashMap;
use std::sync::Arc;

use kbagent_knowledge::{
    Distance, InMemoryVectorStore, Knowledgebase, KnowledgebaseConfig, Metadata,
    MockEmbeddingProvider, SearchOptions, VectorPoint, VectorQuery, VectorStore,
};
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

fn arb_point(dim: usize) -> impl Strategy<Value = VectorPoint> {
    ("[a-z]{3,8}", arb_normalized_embedding(dim))
        .prop_map(|(id, vector)| VectorPoint { id, vector, payload: Metadata::new() })
}

fn arb_distance() -> impl Strategy<Value = Distance> {
    prop_oneof![
        Just(Distance::Cosine),
        Just(Distance::Dot),
        Just(Distance::Euclid),
        Just(Distance::Manhattan),
    ]
}

/// Stored points queried with any threshold and limit come back bounded by
/// both, ordered best first under the collection's metric.
mod prop_store_query_bounds {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_respect_threshold_limit_and_order(
            points in proptest::collection::vec(arb_point(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            distance in arb_distance(),
            threshold in -1.0f32..4.0,
            limit in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM, distance).await.unwrap();

                // Deduplicate by id so upserts don't overwrite each other
                let mut deduped: HashMap<String, VectorPoint> = HashMap::new();
                for point in &points {
                    deduped.entry(point.id.clone()).or_insert_with(|| point.clone());
                }
                let unique: Vec<VectorPoint> = deduped.into_values().collect();
                store.upsert("test", &unique).await.unwrap();

                let request =
                    VectorQuery { vector: query, limit, score_threshold: Some(threshold), filters: None };
                (store.query("test", &request).await.unwrap(), unique.len())
            });

            prop_assert!(results.len() <= limit);
            prop_assert!(results.len() <= unique_count);
            for result in &results {
                prop_assert!(distance.passes(result.score, threshold));
            }
            for window in results.windows(2) {
                if distance.higher_is_closer() {
                    prop_assert!(window[0].score >= window[1].score);
                } else {
                    prop_assert!(window[0].score <= window[1].score);
                }
            }
        }
    }
}

/// `Knowledgebase::search_with` never returns more than the effective limit
/// nor anything below the effective threshold.
mod prop_knowledgebase_search_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn search_results_are_bounded(
            texts in proptest::collection::vec("[a-z]{3,10}( [a-z]{3,10}){0,6}", 1..12),
            query in "[a-z]{3,10}( [a-z]{3,10}){0,3}",
            threshold in 0.0f32..1.0,
            limit in 1usize..10,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let kb = Knowledgebase::new(
                    KnowledgebaseConfig::default(),
                    Arc::new(MockEmbeddingProvider::new(64)),
                    Arc::new(InMemoryVectorStore::new()),
                );
                for (i, text) in texts.iter().enumerate() {
                    kb.add(&format!("doc-{i}"), text, Metadata::new()).await.unwrap();
                }
                let options = SearchOptions::default().score_threshold(threshold).limit(limit);
                kb.search_with(&query, options).await.unwrap()
            });

            prop_assert!(results.len() <= limit);
            for result in &results {
                prop_assert!(result.similarity >= threshold);
            }
            for window in results.windows(2) {
                prop_assert!(window[0].similarity >= window[1].similarity);
            }
        }
    }
}
