//! # kbagent-model
//!
//! Chat-model integrations for the kbagent chat agent.
//!
//! - [`ChatModel`] - the streaming chat-completion trait
//! - [`OpenAiCompatibleModel`] - any OpenAI-compatible `/chat/completions`
//!   endpoint (feature `openai`, on by default)
//! - [`MockChatModel`] - scripted turns for tests
//!
//! Responses stream as [`ChatChunk`]s: text deltas, tool-call fragments and a
//! finish reason.

pub mod error;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
pub mod types;

pub use error::ModelError;
pub use mock::{MockChatModel, MockTurn};
pub use model::ChatModel;
#[cfg(feature = "openai")]
pub use openai::{OpenAiCompatibleModel, OpenAiConfig};
pub use types::{
    ChatChunk, ChatMessage, ChatRequest, ChatStream, FinishReason, Role, ToolCall,
    ToolDeclaration,
};
