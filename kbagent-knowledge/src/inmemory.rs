//! In-memory vector store using exact scans.
//!
//! This module provides [`InMemoryVectorStore`], a dependency-free vector
//! store backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and running the agent without a
//! Qdrant server.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::Distance;
use crate::error::BackendError;
use crate::vectorstore::{ScoredPoint, VectorPoint, VectorQuery, VectorStore};

const BACKEND: &str = "in-memory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    distance: Distance,
    points: HashMap<String, VectorPoint>,
}

/// An in-memory vector store.
///
/// Scores follow Qdrant's conventions: cosine similarity and dot product
/// (higher is closer), Euclidean and Manhattan distance (lower is closer).
///
/// # Example
///
/// ```rust,ignore
/// use kbagent_knowledge::{Distance, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384, Distance::Cosine).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points stored in a collection, if it exists.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.points.len())
    }
}

fn missing(collection: &str) -> BackendError {
    BackendError::new(BACKEND, format!("Not found: Collection `{collection}` doesn't exist!"))
}

/// Compute cosine similarity between two vectors.
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

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        Distance::Euclid => a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt(),
        Distance::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, BackendError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(BackendError::new(
                BACKEND,
                format!("Wrong input: Collection `{name}` already exists!"),
            ));
        }
        collections
            .insert(name.to_string(), Collection { dimensions, distance, points: HashMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError> {
        self.collections.write().await.remove(name).map(|_| ()).ok_or_else(|| missing(name))
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != store.dimensions) {
            return Err(BackendError::new(
                BACKEND,
                format!(
                    "Wrong input: Vector dimension error: expected dim: {}, got {}",
                    store.dimensions,
                    bad.vector.len()
                ),
            ));
        }
        for point in points {
            store.points.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        if query.vector.len() != store.dimensions {
            return Err(BackendError::new(
                BACKEND,
                format!(
                    "Wrong input: Vector dimension error: expected dim: {}, got {}",
                    store.dimensions,
                    query.vector.len()
                ),
            ));
        }

        let distance = store.distance;
        let mut scored: Vec<ScoredPoint> = store
            .points
            .values()
            .filter(|p| query.filters.as_ref().is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                payload: p.payload.clone(),
                score: score(distance, &p.vector, &query.vector),
            })
            .filter(|p| query.score_threshold.is_none_or(|t| distance.passes(p.score, t)))
            .collect();

        scored.sort_by(|a, b| {
            let ordering = a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal);
            if distance.higher_is_closer() { ordering.reverse() } else { ordering }
        });
        scored.truncate(query.limit);
        Ok(scored)
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for id in ids {
            store.points.remove(*id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn point(id: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint { id: id.into(), vector, payload: Metadata::new() }
    }

    #[tokio::test]
    async fn second_create_reports_conflict() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2, Distance::Cosine).await.unwrap();
        let err = store.create_collection("kb", 2, Distance::Cosine).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn rejects_wrong_dimensions() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2, Distance::Cosine).await.unwrap();
        assert!(store.upsert("kb", &[point("a", vec![1.0, 0.0, 0.0])]).await.is_err());
        assert_eq!(store.len("kb").await, Some(0));
    }

    #[tokio::test]
    async fn euclid_orders_nearest_first() {
        let store = InMemoryVectorStore::new();
        store.create_collection("kb", 2, Distance::Euclid).await.unwrap();
        store
            .upsert("kb", &[point("far", vec![5.0, 5.0]), point("near", vec![1.0, 0.1])])
            .await
            .unwrap();

        let query =
            VectorQuery { vector: vec![1.0, 0.0], limit: 2, score_threshold: None, filters: None };
        let hits = store.query("kb", &query).await.unwrap();
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].score < hits[1].score);
    }

    #[tokio::test]
    async fn operations_on_missing_collection_fail() {
        let store = InMemoryVectorStore::new();
        let query = VectorQuery { vector: vec![1.0], limit: 1, score_threshold: None, filters: None };
        assert!(store.query("nope", &query).await.is_err());
        assert!(store.delete("nope", &["a"]).await.is_err());
        assert!(store.delete_collection("nope").await.is_err());
    }
}
