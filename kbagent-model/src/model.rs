use async_trait::async_trait;

use crate::error::ModelError;
use crate::types::{ChatRequest, ChatStream};

/// A chat-completion model that streams its answer.
///
/// # Example
///
/// ```rust,ignore
/// use futures::StreamExt;
/// use kbagent_model::{ChatChunk, ChatMessage, ChatModel, ChatRequest};
///
/// let mut stream = model.stream(ChatRequest::new(vec![ChatMessage::user("Hi")])).await?;
/// while let Some(chunk) = stream.next().await {
///     if let ChatChunk::TextDelta(text) = chunk? {
///         print!("{text}");
///     }
/// }
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier sent to the provider.
    fn name(&self) -> &str;

    /// Start a completion. Errors before the first chunk are returned here;
    /// errors after that arrive as items of the stream.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, ModelError>;
}
