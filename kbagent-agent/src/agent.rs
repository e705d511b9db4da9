//! The conversational agent: prompt hook, model and tools in a ReAct loop.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use kbagent_model::{ChatChunk, ChatMessage, ChatModel, ChatRequest, ToolCall};
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{PromptHook, StaticPrompt};
use crate::error::{AgentError, Result};
use crate::thread::ThreadStore;
use crate::tool::{Tool, ToolRegistry};

/// Model calls allowed per turn unless configured otherwise.
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Something that happened while the agent worked on a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Assistant text as it streams in.
    TextDelta(String),
    /// The model asked for a tool.
    ToolCall(ToolCall),
    /// A tool finished; errors are reported inside `result`.
    ToolResult { id: String, name: String, result: Value },
    /// The turn is over; `text` is the final assistant reply.
    Done { text: String },
}

/// Events of one turn, ending with [`AgentEvent::Done`] or an error.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// Merges streamed tool-call fragments by index.
#[derive(Debug, Default)]
struct ToolCallBuffer {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallBuffer {
    fn push(&mut self, index: usize, id: Option<String>, name: Option<String>, arguments: &str) {
        let call = self.calls.entry(index).or_insert_with(|| ToolCall {
            id: String::new(),
            name: String::new(),
            arguments: String::new(),
        });
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            call.id = id;
        }
        if let Some(name) = name {
            call.name.push_str(&name);
        }
        call.arguments.push_str(arguments);
    }

    fn finish(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .map(|(index, mut call)| {
                if call.id.is_empty() {
                    call.id = format!("call_{index}");
                }
                call
            })
            .collect()
    }
}

/// A chat agent bound to a model, a prompt hook and a toolset.
///
/// Cloning is cheap; clones share the model, tools and thread memory.
///
/// # Example
///
/// ```rust,ignore
/// use futures::StreamExt;
/// use kbagent_agent::{Agent, AgentEvent};
///
/// let agent = Agent::builder(model).hook(Arc::new(context)).build()?;
/// let mut events = agent.run("thread-1", "What colour is the sky?");
/// while let Some(event) = events.next().await {
///     if let AgentEvent::TextDelta(text) = event? {
///         print!("{text}");
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Agent {
    name: String,
    model: Arc<dyn ChatModel>,
    hook: Arc<dyn PromptHook>,
    tools: ToolRegistry,
    threads: Arc<ThreadStore>,
    max_steps: usize,
    temperature: Option<f32>,
}

impl Agent {
    pub fn builder(model: Arc<dyn ChatModel>) -> AgentBuilder {
        AgentBuilder::new(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threads(&self) -> &Arc<ThreadStore> {
        &self.threads
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `input` in the conversation `thread_id`.
    ///
    /// Each step asks the hook for messages, then streams the model's reply.
    /// Requested tools run and their results feed the next step; a reply
    /// without tool calls ends the turn and is saved to the thread together
    /// with the user message and any tool exchanges. A failed turn leaves the
    /// thread unchanged.
    pub fn run(&self, thread_id: impl Into<String>, input: impl Into<String>) -> AgentStream {
        let agent = self.clone();
        let thread_id = thread_id.into();
        let input = input.into();

        Box::pin(try_stream! {
            let history = agent.threads.history(&thread_id).await;
            let mut turn = vec![ChatMessage::user(input)];
            let declarations = agent.tools.declarations();
            let mut finished = false;

            for step in 1..=agent.max_steps {
                let mut conversation = history.clone();
                conversation.extend(turn.iter().cloned());
                let messages = agent.hook.messages(&conversation).await;

                let mut request = ChatRequest::new(messages).with_tools(declarations.clone());
                request.temperature = agent.temperature;
                debug!(agent = %agent.name, thread_id = %thread_id, step, "calling model");

                let mut chunks = agent.model.stream(request).await.map_err(AgentError::Model)?;
                let mut text = String::new();
                let mut buffer = ToolCallBuffer::default();
                while let Some(chunk) = chunks.next().await {
                    match chunk.map_err(AgentError::Model)? {
                        ChatChunk::TextDelta(delta) => {
                            text.push_str(&delta);
                            yield AgentEvent::TextDelta(delta);
                        }
                        ChatChunk::ToolCallDelta { index, id, name, arguments } => {
                            buffer.push(index, id, name, &arguments);
                        }
                        ChatChunk::Finish(_) => {}
                    }
                }

                let calls = buffer.finish();
                if calls.is_empty() {
                    turn.push(ChatMessage::assistant(text.clone()));
                    agent.threads.append(&thread_id, turn.clone()).await;
                    info!(agent = %agent.name, thread_id = %thread_id, steps = step, "turn finished");
                    yield AgentEvent::Done { text };
                    finished = true;
                    break;
                }

                turn.push(ChatMessage::assistant_tool_calls(text, calls.clone()));
                for call in calls {
                    yield AgentEvent::ToolCall(call.clone());
                    let result = agent.tools.execute(&call).await;
                    turn.push(ChatMessage::tool(call.id.clone(), result.to_string()));
                    yield AgentEvent::ToolResult { id: call.id, name: call.name, result };
                }
            }

            if !finished {
                Err::<(), _>(AgentError::StepLimit(agent.max_steps))?;
            }
        })
    }

    /// Run a turn to completion and return the final reply.
    pub async fn respond(&self, thread_id: impl Into<String>, input: impl Into<String>) -> Result<String> {
        let mut events = self.run(thread_id, input);
        let mut reply = String::new();
        while let Some(event) = events.next().await {
            if let AgentEvent::Done { text } = event? {
                reply = text;
            }
        }
        Ok(reply)
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    model: Arc<dyn ChatModel>,
    hook: Arc<dyn PromptHook>,
    tools: ToolRegistry,
    threads: Option<Arc<ThreadStore>>,
    max_steps: usize,
    temperature: Option<f32>,
}

impl AgentBuilder {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: "kbagent".to_string(),
            model,
            hook: Arc::new(StaticPrompt::default()),
            tools: ToolRegistry::new(),
            threads: None,
            max_steps: DEFAULT_MAX_STEPS,
            temperature: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the hook that builds each step's messages.
    pub fn hook(mut self, hook: Arc<dyn PromptHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Share thread memory with other agents; a fresh store is used otherwise.
    pub fn threads(mut self, threads: Arc<ThreadStore>) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if `max_steps` is zero or the
    /// name is empty.
    pub fn build(self) -> Result<Agent> {
        if self.max_steps == 0 {
            return Err(AgentError::InvalidConfig("max_steps must be greater than zero".into()));
        }
        if self.name.trim().is_empty() {
            return Err(AgentError::InvalidConfig("agent name must not be empty".into()));
        }
        Ok(Agent {
            name: self.name,
            model: self.model,
            hook: self.hook,
            tools: self.tools,
            threads: self.threads.unwrap_or_default(),
            max_steps: self.max_steps,
            temperature: self.temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_fragments_merge_by_index() {
        let mut buffer = ToolCallBuffer::default();
        buffer.push(0, Some("call_a".into()), Some("search".into()), "{\"query\":");
        buffer.push(1, None, Some("other".into()), "{}");
        buffer.push(0, None, None, "\"sky\"}");

        let calls = buffer.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, "{\"query\":\"sky\"}");
        assert_eq!(calls[1].id, "call_1");
    }
}
