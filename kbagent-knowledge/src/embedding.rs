//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// A provider that turns text into a fixed-length embedding vector.
///
/// Every call is expected to reach the backend: implementations do not cache,
/// so embedding the same text twice costs two requests.
///
/// # Example
///
/// ```rust,ignore
/// use kbagent_knowledge::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Name of the embedding model.
    fn model(&self) -> &str;
}
