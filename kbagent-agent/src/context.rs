//! System-prompt construction, optionally enriched from a knowledgebase.

use async_trait::async_trait;
use kbagent_knowledge::{Knowledgebase, SearchResult};
use kbagent_model::{ChatMessage, Role};
use tracing::{info, warn};

/// Instructions every conversation starts with.
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant. Answer the user's questions \
using the information you are given and the tools you have. When the provided information \
does not cover a question, say so instead of guessing.\n";

const CONTEXT_HEADER: &str = "Relevant information from previous conversations:\n";

/// Builds the messages sent to the model for one step.
///
/// Implementations return the system message followed by `history`.
#[async_trait]
pub trait PromptHook: Send + Sync {
    async fn messages(&self, history: &[ChatMessage]) -> Vec<ChatMessage>;
}

/// A fixed system prompt.
#[derive(Debug, Clone)]
pub struct StaticPrompt {
    prompt: String,
}

impl StaticPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into() }
    }
}

impl Default for StaticPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

#[async_trait]
impl PromptHook for StaticPrompt {
    async fn messages(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        with_system(&self.prompt, history)
    }
}

fn with_system(system: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system));
    messages.extend_from_slice(history);
    messages
}

/// Appends knowledgebase entries similar to the latest user message to the
/// prompt.
///
/// Retrieval never fails the turn: when the search errors, the error text is
/// appended to the prompt instead.
#[derive(Clone)]
pub struct KnowledgebaseContext {
    knowledgebase: Knowledgebase,
    prompt: String,
}

impl KnowledgebaseContext {
    pub fn new(knowledgebase: Knowledgebase) -> Self {
        Self::with_prompt(knowledgebase, DEFAULT_PROMPT)
    }

    pub fn with_prompt(knowledgebase: Knowledgebase, prompt: impl Into<String>) -> Self {
        Self { knowledgebase, prompt: prompt.into() }
    }

    /// The system prompt for a conversation whose latest user text is `query`.
    pub async fn system_prompt(&self, query: &str) -> String {
        match self.knowledgebase.search(query).await {
            Ok(results) if results.is_empty() => self.prompt.clone(),
            Ok(results) => {
                info!(count = results.len(), "retrieved documents from knowledgebase");
                format!("{}{}", self.prompt, render_context(&results))
            }
            Err(e) => {
                let context = format!(" Could not retrieve documents from store: {e}");
                warn!(error = %e, "{context}");
                format!("{}{context}", self.prompt)
            }
        }
    }
}

fn render_context(results: &[SearchResult]) -> String {
    let mut context = String::from(CONTEXT_HEADER);
    for result in results {
        context.push_str(&format!("- {} (score: {})\n", result.value, result.similarity));
    }
    context
}

/// Text of the most recent user message, or empty when there is none.
fn latest_user_text(history: &[ChatMessage]) -> &str {
    history.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str()).unwrap_or("")
}

#[async_trait]
impl PromptHook for KnowledgebaseContext {
    async fn messages(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let prompt = self.system_prompt(latest_user_text(history)).await;
        with_system(&prompt, history)
    }
}
