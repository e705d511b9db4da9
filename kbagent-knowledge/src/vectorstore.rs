//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::config::Distance;
use crate::document::{Metadata, SearchFilters};
use crate::error::BackendError;

/// Name of the vector slot every point is stored under.
pub const DEFAULT_VECTOR_NAME: &str = "default";

/// A vector plus payload to be written under `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Metadata,
}

/// A nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub score_threshold: Option<f32>,
    pub filters: Option<SearchFilters>,
}

/// A stored point returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub payload: Metadata,
    pub score: f32,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Every method reports failures as a [`BackendError`] so that the
/// [`Knowledgebase`](crate::Knowledgebase) can tag them with the action that
/// was running.
///
/// # Example
///
/// ```rust,ignore
/// use kbagent_knowledge::{InMemoryVectorStore, VectorStore, Distance};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384, Distance::Cosine).await?;
/// store.upsert("docs", &points).await?;
/// let hits = store.query("docs", &query).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in error messages.
    fn backend(&self) -> &'static str;

    /// Whether the collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, BackendError>;

    /// Create a collection. Fails with a conflict if it already exists.
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), BackendError>;

    /// Delete a collection and all its points.
    async fn delete_collection(&self, name: &str) -> Result<(), BackendError>;

    /// Insert or replace points.
    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), BackendError>;

    /// Return the closest points, best first.
    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, BackendError>;

    /// Delete points by id.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<(), BackendError>;
}
