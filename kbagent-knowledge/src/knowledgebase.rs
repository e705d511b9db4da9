//! The knowledgebase: embedding plus a lazily provisioned vector collection.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::KnowledgebaseConfig;
use crate::document::{Document, KEY_FIELD, Metadata, SearchOptions, SearchResult, TEXT_FIELD};
use crate::embedding::EmbeddingProvider;
use crate::error::{BackendError, Result, StoreAction, StoreError};
use crate::vectorstore::{ScoredPoint, VectorPoint, VectorQuery, VectorStore};

/// Check-then-create rounds made before a collection conflict is reported.
pub const MAX_PROVISION_ATTEMPTS: u32 = 3;

/// Map a caller key to an id the vector store accepts.
///
/// Keys already written as a lowercase hyphenated UUID or a plain unsigned
/// integer pass through. Any other key, including spellings such as `007`,
/// `+7` or an uppercase UUID that the store would fold onto another id,
/// becomes a UUID v5 derived from it, so distinct keys never share a point.
pub fn point_id(key: &str) -> String {
    if is_canonical_uuid(key) || is_canonical_u64(key) {
        return key.to_string();
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

pub(crate) fn is_canonical_u64(key: &str) -> bool {
    key.parse::<u64>().is_ok_and(|n| n.to_string() == key)
}

pub(crate) fn is_canonical_uuid(key: &str) -> bool {
    Uuid::parse_str(key).is_ok_and(|u| u.hyphenated().to_string() == key)
}

/// Stores text as embeddings in one collection and retrieves similar entries.
///
/// The collection is created on first write, sized to the embedding the
/// provider returns.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use kbagent_knowledge::{InMemoryVectorStore, Knowledgebase, KnowledgebaseConfig, MockEmbeddingProvider};
///
/// let kb = Knowledgebase::new(
///     KnowledgebaseConfig::default(),
///     Arc::new(MockEmbeddingProvider::new(64)),
///     Arc::new(InMemoryVectorStore::new()),
/// );
/// kb.add("doc-1", "The sky is blue", Default::default()).await?;
/// let results = kb.search("sky color").await?;
/// ```
#[derive(Clone)]
pub struct Knowledgebase {
    config: KnowledgebaseConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Knowledgebase {
    pub fn new(
        config: KnowledgebaseConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { config, embedder, store }
    }

    pub fn config(&self) -> &KnowledgebaseConfig {
        &self.config
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    async fn embed(&self, text: &str, action: StoreAction) -> Result<Vec<f32>> {
        self.embedder.embed(text).await.map_err(|source| StoreError::Embedding { action, source })
    }

    /// Embed `text` and store it under `key` with `metadata`.
    ///
    /// The collection is checked (and created if missing) on every call.
    pub async fn add(&self, key: &str, text: &str, metadata: Metadata) -> Result<()> {
        let vector = self.embed(text, StoreAction::Adding).await?;
        self.ensure_collection(vector.len()).await?;

        let mut payload = metadata;
        payload.insert(TEXT_FIELD.to_string(), Value::String(text.to_string()));
        payload.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));

        let point = VectorPoint { id: point_id(key), vector, payload };
        self.store
            .upsert(&self.config.collection, &[point])
            .await
            .map_err(|source| StoreError::Backend { action: StoreAction::Adding, source })?;

        debug!(collection = %self.config.collection, key, "added document");
        Ok(())
    }

    /// Add a [`Document`] under its own id.
    pub async fn add_document(&self, document: &Document) -> Result<()> {
        self.add(&document.id, &document.text, document.metadata.clone()).await
    }

    /// Search with the configured threshold and limit.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, SearchOptions::default()).await
    }

    /// Search with per-call overrides. Results are ordered most similar first.
    pub async fn search_with(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        let threshold = options.score_threshold.unwrap_or(self.config.score_threshold);
        let limit = options.limit.unwrap_or(self.config.limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed(query, StoreAction::Searching).await?;
        let request =
            VectorQuery { vector, limit, score_threshold: Some(threshold), filters: options.filters };

        let mut points = self
            .store
            .query(&self.config.collection, &request)
            .await
            .map_err(|source| StoreError::Backend { action: StoreAction::Searching, source })?;

        let distance = self.config.distance;
        points.retain(|p| distance.passes(p.score, threshold));
        points.sort_by(|a, b| {
            let ordering = a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal);
            if distance.higher_is_closer() { ordering.reverse() } else { ordering }
        });
        points.truncate(limit);

        debug!(collection = %self.config.collection, count = points.len(), threshold, limit, "searched knowledgebase");
        Ok(points.into_iter().map(to_result).collect())
    }

    /// Remove the entry stored under `key`.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let id = point_id(key);
        self.store
            .delete(&self.config.collection, &[id.as_str()])
            .await
            .map_err(|source| StoreError::Backend { action: StoreAction::Deleting, source })?;
        debug!(collection = %self.config.collection, key, "deleted document");
        Ok(())
    }

    /// Drop the whole collection.
    pub async fn delete_collection(&self) -> Result<()> {
        self.store.delete_collection(&self.config.collection).await.map_err(|source| {
            StoreError::Backend { action: StoreAction::DeletingCollection, source }
        })?;
        info!(collection = %self.config.collection, "deleted collection");
        Ok(())
    }

    /// Make sure the collection exists, creating it with `dimensions` if not.
    ///
    /// A creation that conflicts runs the whole check again, up to
    /// [`MAX_PROVISION_ATTEMPTS`] rounds in total.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let collection = &self.config.collection;
        let backend_err =
            |source: BackendError| StoreError::Backend { action: StoreAction::CreatingCollection, source };

        let mut attempt = 1;
        loop {
            if self.store.collection_exists(collection).await.map_err(backend_err)? {
                return Ok(());
            }

            match self.store.create_collection(collection, dimensions, self.config.distance).await {
                Ok(()) => {
                    info!(collection = %collection, dimensions, distance = %self.config.distance, "created collection");
                    return Ok(());
                }
                Err(source) if source.is_conflict() => {
                    if attempt >= MAX_PROVISION_ATTEMPTS {
                        return Err(StoreError::CollectionConflict {
                            collection: collection.clone(),
                            attempts: attempt,
                            source,
                        });
                    }
                    warn!(collection = %collection, attempt, error = %source, "collection creation conflicted, retrying");
                    attempt += 1;
                }
                Err(source) => return Err(backend_err(source)),
            }
        }
    }
}

fn to_result(point: ScoredPoint) -> SearchResult {
    let key = match point.payload.get(KEY_FIELD) {
        Some(Value::String(key)) => key.clone(),
        _ => point.id,
    };
    let value = Value::Object(point.payload.clone()).to_string();
    SearchResult { key, value, payload: point.payload, similarity: point.score }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_ids_pass_through() {
        assert_eq!(point_id("17"), "17");
        let uuid = "9b2c6c2e-5f4c-4c1a-8d7e-2a7f3a1c0b11";
        assert_eq!(point_id(uuid), uuid);
    }

    #[test]
    fn non_canonical_spellings_get_their_own_ids() {
        let uuid = "9b2c6c2e-5f4c-4c1a-8d7e-2a7f3a1c0b11";
        let upper = uuid.to_uppercase();
        let keys = ["7", "007", "+7", uuid, upper.as_str(), "9b2c6c2e5f4c4c1a8d7e2a7f3a1c0b11"];
        let ids: std::collections::HashSet<String> = keys.iter().map(|k| point_id(k)).collect();
        assert_eq!(ids.len(), keys.len());
        assert!(Uuid::parse_str(&point_id("007")).is_ok());
    }

    #[test]
    fn other_keys_map_to_stable_uuids() {
        let id = point_id("doc-1");
        assert_eq!(id, point_id("doc-1"));
        assert_ne!(id, point_id("doc-2"));
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn result_reports_caller_key() {
        let mut payload = Metadata::new();
        payload.insert(KEY_FIELD.into(), "doc-1".into());
        payload.insert(TEXT_FIELD.into(), "The sky is blue".into());
        let result = to_result(ScoredPoint { id: point_id("doc-1"), payload, score: 0.8 });

        assert_eq!(result.key, "doc-1");
        assert!(result.value.contains("The sky is blue"));
        assert_eq!(result.text(), Some("The sky is blue"));
    }
}
