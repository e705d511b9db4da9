//! # kbagent-agent
//!
//! Agent runtime for the kbagent chat agent.
//!
//! An [`Agent`] binds a [`ChatModel`](kbagent_model::ChatModel), a
//! [`PromptHook`] and a [`ToolRegistry`]. Each turn the hook builds the
//! messages ([`KnowledgebaseContext`] injects similar knowledgebase entries
//! into the system prompt), the model streams its reply, and requested tools
//! run until the model answers without calling any. Conversations are kept
//! per thread id in a [`ThreadStore`].

pub mod agent;
pub mod context;
pub mod error;
pub mod thread;
pub mod tool;
pub mod tools;

pub use agent::{Agent, AgentBuilder, AgentEvent, AgentStream, DEFAULT_MAX_STEPS};
pub use context::{DEFAULT_PROMPT, KnowledgebaseContext, PromptHook, StaticPrompt};
pub use error::{AgentError, Result, ToolError};
pub use thread::ThreadStore;
pub use tool::{Tool, ToolRegistry};
pub use tools::{KNOWLEDGEBASE_SEARCH, KnowledgebaseSearchTool};
