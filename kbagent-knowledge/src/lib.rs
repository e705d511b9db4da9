//! # kbagent-knowledge
//!
//! Vector-backed knowledgebase for the kbagent chat agent.
//!
//! ## Overview
//!
//! - [`Knowledgebase`] - embeds text and stores it in one collection,
//!   creating the collection on first write
//! - [`EmbeddingProvider`] - text to vector; [`HttpEmbeddingModel`] calls a
//!   remote embeddings endpoint, [`MockEmbeddingProvider`] hashes locally
//! - [`VectorStore`] - storage backends: [`QdrantVectorStore`] (feature
//!   `qdrant`, on by default) and [`InMemoryVectorStore`]
//! - [`loader`] - bulk loading of a directory of documents
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kbagent_knowledge::{InMemoryVectorStore, Knowledgebase, KnowledgebaseConfig, MockEmbeddingProvider};
//!
//! let kb = Knowledgebase::new(
//!     KnowledgebaseConfig::default(),
//!     Arc::new(MockEmbeddingProvider::new(64)),
//!     Arc::new(InMemoryVectorStore::new()),
//! );
//! kb.add("doc-1", "The sky is blue", Default::default()).await?;
//! for result in kb.search("sky color").await? {
//!     println!("{} ({})", result.value, result.similarity);
//! }
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod http_embedding;
pub mod inmemory;
pub mod knowledgebase;
pub mod loader;
pub mod mock;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod vectorstore;

pub use config::{Distance, KnowledgebaseConfig, KnowledgebaseConfigBuilder};
pub use document::{
    Document, FieldMatch, MatchValue, Metadata, SearchFilters, SearchOptions, SearchResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{BackendError, EmbeddingError, Result, StoreAction, StoreError};
pub use http_embedding::{EmbeddingConfig, EmbeddingModelType, HttpEmbeddingModel};
pub use inmemory::InMemoryVectorStore;
pub use knowledgebase::Knowledgebase;
pub use loader::{FailedDocument, LoadError, LoadReport, StoredDocument, load_directory};
pub use mock::MockEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::{QdrantStoreConfig, QdrantVectorStore};
pub use vectorstore::{ScoredPoint, VectorPoint, VectorQuery, VectorStore};
