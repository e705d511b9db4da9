//! Integration tests for the knowledgebase over in-memory and scripted stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use kbagent_knowledge::{
    BackendError, Distance, EmbeddingError, EmbeddingProvider, InMemoryVectorStore, Knowledgebase,
    KnowledgebaseConfig, Metadata, MockEmbeddingProvider, ScoredPoint, SearchFilters,
    SearchOptions, StoreAction, StoreError, VectorPoint, VectorQuery, VectorStore,
};
use serde_json::json;

fn metadata(value: serde_json::Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

fn knowledgebase(store: Arc<dyn VectorStore>) -> Knowledgebase {
    Knowledgebase::new(KnowledgebaseConfig::default(), Arc::new(MockEmbeddingProvider::new(256)), store)
}

/// Delegates to an in-memory store but fails `create_collection` in scripted ways.
struct ScriptedStore {
    inner: InMemoryVectorStore,
    conflicts: AtomicU32,
    fail_other: bool,
    create_calls: AtomicU32,
    exists_calls: AtomicU32,
}

impl ScriptedStore {
    fn conflicting(times: u32) -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            conflicts: AtomicU32::new(times),
            fail_other: false,
            create_calls: AtomicU32::new(0),
            exists_calls: AtomicU32::new(0),
        }
    }

    fn broken() -> Self {
        Self { fail_other: true, ..Self::conflicting(0) }
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    fn backend(&self) -> &'static str {
        "scripted"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, BackendError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.collection_exists(name).await
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), BackendError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_other {
            return Err(BackendError::with_status("scripted", 14, "connection refused"));
        }
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::with_status(
                "scripted",
                6,
                format!("Collection `{name}` already exists!"),
            ));
        }
        self.inner.create_collection(name, dimensions, distance).await
    }

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), BackendError> {
        self.inner.upsert(collection, points).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        self.inner.query(collection, query).await
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<(), BackendError> {
        self.inner.delete(collection, ids).await
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Http { model: "broken".into(), status: 503, message: "unavailable".into() })
    }

    fn model(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn added_text_is_found_by_related_query() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("doc-1", "The sky is blue", metadata(json!({"documentName": "a.txt"}))).await.unwrap();

    let results = kb.search("sky color").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key, "doc-1");
    assert!(results[0].value.contains("The sky is blue"));
    assert!(results[0].similarity >= 0.25);
    assert_eq!(results[0].payload["documentName"], "a.txt");
}

#[tokio::test]
async fn same_text_scores_above_threshold() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("k", "rust ownership and borrowing", Metadata::new()).await.unwrap();

    let results = kb.search("rust ownership and borrowing").await.unwrap();
    assert!((results[0].similarity - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn unrelated_text_is_filtered_by_threshold() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("k", "The sky is blue", Metadata::new()).await.unwrap();

    assert!(kb.search("quarterly invoice totals").await.unwrap().is_empty());
}

#[tokio::test]
async fn metadata_cannot_override_stored_text() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("k", "The sky is blue", metadata(json!({"text": "spoofed"}))).await.unwrap();

    let results = kb.search("sky").await.unwrap();
    assert_eq!(results[0].text(), Some("The sky is blue"));
}

#[tokio::test]
async fn provisioning_succeeds_on_third_attempt() {
    let store = Arc::new(ScriptedStore::conflicting(2));
    let kb = knowledgebase(store.clone());

    kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap();

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.exists_calls.load(Ordering::SeqCst), 3);
    assert_eq!(kb.search("sky").await.unwrap().len(), 1);
}

#[tokio::test]
async fn provisioning_gives_up_after_three_attempts() {
    let store = Arc::new(ScriptedStore::conflicting(u32::MAX));
    let kb = knowledgebase(store.clone());

    let err = kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap_err();

    match &err {
        StoreError::CollectionConflict { collection, attempts, .. } => {
            assert_eq!(collection, "knowledgebase");
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected CollectionConflict, got {other:?}"),
    }
    assert_eq!(err.action(), Some(StoreAction::CreatingCollection));
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_conflict_creation_failure_is_not_retried() {
    let store = Arc::new(ScriptedStore::broken());
    let kb = knowledgebase(store.clone());

    let err = kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap_err();

    assert!(matches!(err, StoreError::Backend { action: StoreAction::CreatingCollection, .. }));
    assert_eq!(err.status(), Some(14));
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn existing_collection_is_checked_on_every_add() {
    let store = Arc::new(ScriptedStore::conflicting(0));
    let kb = knowledgebase(store.clone());

    kb.add("a", "first entry", Metadata::new()).await.unwrap();
    kb.add("b", "second entry", Metadata::new()).await.unwrap();

    assert_eq!(store.exists_calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delete_removes_entry() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap();

    kb.delete("doc-1").await.unwrap();

    assert!(kb.search("sky").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_collection_makes_search_fail() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap();

    kb.delete_collection().await.unwrap();

    let err = kb.search("sky").await.unwrap_err();
    assert_eq!(err.action(), Some(StoreAction::Searching));
}

#[tokio::test]
async fn filters_restrict_results() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    kb.add("a", "The sky is blue", metadata(json!({"documentName": "a.txt"}))).await.unwrap();
    kb.add("b", "The sky is grey", metadata(json!({"documentName": "b.txt"}))).await.unwrap();

    let options = SearchOptions::default()
        .filters(SearchFilters::new().must_match("documentName", "b.txt"))
        .score_threshold(0.0);
    let results = kb.search_with("sky", options).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key, "b");
}

#[tokio::test]
async fn limit_override_caps_results() {
    let kb = knowledgebase(Arc::new(InMemoryVectorStore::new()));
    for i in 0..4 {
        kb.add(&format!("doc-{i}"), "The sky is blue", Metadata::new()).await.unwrap();
    }

    assert_eq!(kb.search("sky").await.unwrap().len(), 4);
    let results = kb.search_with("sky", SearchOptions::default().limit(2)).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn embedding_failure_is_tagged_with_action() {
    let kb = Knowledgebase::new(
        KnowledgebaseConfig::default(),
        Arc::new(FailingEmbedder),
        Arc::new(InMemoryVectorStore::new()),
    );

    let err = kb.add("k", "text", Metadata::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::Embedding { action: StoreAction::Adding, .. }));
    assert_eq!(err.status(), Some(503));

    let err = kb.search("text").await.unwrap_err();
    assert_eq!(err.action(), Some(StoreAction::Searching));
}
