//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Every collection stores its vectors under the named vector
//! [`DEFAULT_VECTOR_NAME`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kbagent_knowledge::qdrant::{QdrantStoreConfig, QdrantVectorStore};
//!
//! let store = QdrantVectorStore::new(QdrantStoreConfig::new("http://localhost:6334"))?;
//! store.create_collection("docs", 3072, Distance::Cosine).await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance as QdrantDistance, Filter,
    PointId, PointStruct, PointsIdsList, QueryPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder, VectorsConfigBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::Value;
use tracing::debug;

use crate::config::Distance;
use crate::document::{MatchValue, Metadata, SearchFilters};
use crate::error::BackendError;
use crate::knowledgebase::is_canonical_u64;
use crate::vectorstore::{DEFAULT_VECTOR_NAME, ScoredPoint, VectorPoint, VectorQuery, VectorStore};

const BACKEND: &str = "qdrant";

/// Default gRPC endpoint of a local Qdrant server.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Connection settings for [`QdrantVectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantStoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for QdrantStoreConfig {
    fn default() -> Self {
        Self { url: DEFAULT_QDRANT_URL.to_string(), api_key: None, timeout: None }
    }
}

impl QdrantStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connect to the Qdrant server described by `config`.
    ///
    /// The server version compatibility check is skipped, so construction
    /// does not contact the server.
    pub fn new(config: QdrantStoreConfig) -> Result<Self, BackendError> {
        let mut builder = Qdrant::from_url(&config.url).api_key(config.api_key);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.skip_compatibility_check().build().map_err(map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

/// Carry the gRPC status code and message of a response error; everything
/// else is reported by its display text.
fn map_err(e: QdrantError) -> BackendError {
    match e {
        QdrantError::ResponseError { status } => {
            BackendError::with_status(BACKEND, status.code() as i32, status.message())
        }
        other => BackendError::new(BACKEND, other.to_string()),
    }
}

fn qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Euclid => QdrantDistance::Euclid,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Manhattan => QdrantDistance::Manhattan,
    }
}

/// Canonical numeric ids go over the wire as integers, anything else as a
/// UUID string.
fn point_id(id: &str) -> PointId {
    match id.parse::<u64>() {
        Ok(num) if is_canonical_u64(id) => num.into(),
        _ => id.to_string().into(),
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options) {
        Some(PointIdOptions::Uuid(s)) => s,
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn filter(filters: &SearchFilters) -> Filter {
    Filter::must(filters.must.iter().map(|condition| {
        let field = condition.field.clone();
        match &condition.value {
            MatchValue::Keyword(s) => Condition::matches(field, s.clone()),
            MatchValue::Integer(i) => Condition::matches(field, *i),
            MatchValue::Bool(b) => Condition::matches(field, *b),
        }
    }))
}

fn json_value(value: QdrantValue) -> Option<Value> {
    match value.kind? {
        Kind::NullValue(_) => Some(Value::Null),
        Kind::BoolValue(b) => Some(Value::Bool(b)),
        Kind::IntegerValue(i) => Some(Value::from(i)),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(f).map(Value::Number),
        Kind::StringValue(s) => Some(Value::String(s)),
        Kind::ListValue(list) => {
            Some(Value::Array(list.values.into_iter().filter_map(json_value).collect()))
        }
        Kind::StructValue(st) => Some(Value::Object(json_payload(st.fields))),
    }
}

fn json_payload(fields: HashMap<String, QdrantValue>) -> Metadata {
    fields.into_iter().filter_map(|(k, v)| json_value(v).map(|v| (k, v))).collect()
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, BackendError> {
        self.client.collection_exists(name).await.map_err(map_err)
    }

    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), BackendError> {
        let mut vectors = VectorsConfigBuilder::default();
        vectors.add_named_vector_params(
            DEFAULT_VECTOR_NAME,
            VectorParamsBuilder::new(dimensions as u64, qdrant_distance(distance)),
        );

        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(vectors))
            .await
            .map_err(map_err)?;

        debug!(collection = name, dimensions, %distance, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), BackendError> {
        self.client.delete_collection(name).await.map_err(map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[VectorPoint]) -> Result<(), BackendError> {
        if points.is_empty() {
            return Ok(());
        }

        let points = points
            .iter()
            .map(|point| {
                let payload = Payload::try_from(Value::Object(point.payload.clone()))
                    .map_err(map_err)?;
                let vectors = HashMap::from([(DEFAULT_VECTOR_NAME.to_string(), point.vector.clone())]);
                Ok(PointStruct::new(point_id(&point.id), vectors, payload))
            })
            .collect::<Result<Vec<_>, BackendError>>()?;
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, count, "upserted points to qdrant");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &VectorQuery,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        let mut builder = QueryPointsBuilder::new(collection)
            .query(query.vector.clone())
            .using(DEFAULT_VECTOR_NAME)
            .with_payload(true)
            .limit(query.limit as u64);
        if let Some(threshold) = query.score_threshold {
            builder = builder.score_threshold(threshold);
        }
        if let Some(filters) = query.filters.as_ref().filter(|f| !f.is_empty()) {
            builder = builder.filter(filter(filters));
        }

        let response = self.client.query(builder).await.map_err(map_err)?;

        let points: Vec<ScoredPoint> = response
            .result
            .into_iter()
            .map(|scored| ScoredPoint {
                id: point_id_string(scored.id),
                payload: json_payload(scored.payload),
                score: scored.score,
            })
            .collect();

        debug!(collection, count = points.len(), "queried qdrant");
        Ok(points)
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<(), BackendError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<PointId> = ids.iter().map(|id| point_id(id)).collect();
        let count = ids.len();

        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(PointsIdsList { ids }).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection, count, "deleted points from qdrant");
        Ok(())
    }
}
