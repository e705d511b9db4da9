//! Scripted chat model for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream;

use crate::error::ModelError;
use crate::model::ChatModel;
use crate::types::{ChatChunk, ChatRequest, ChatStream, FinishReason, ToolCall};

/// One scripted response of a [`MockChatModel`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockTurn {
    /// Stream `text` word by word, then stop.
    Text(String),
    /// Request the given tool calls.
    ToolCalls(Vec<ToolCall>),
    /// Stream `text`, then request the given tool calls in the same step.
    TextThenToolCalls(String, Vec<ToolCall>),
    /// Fail before streaming anything.
    Fail(String),
    /// Stream `text`, then fail mid-stream.
    TextThenFail(String, String),
}

impl MockTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A turn requesting a single tool call.
    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::ToolCalls(vec![single_call(id, name, arguments)])
    }

    /// A turn that says `text` before requesting a single tool call.
    pub fn narrated_tool_call(
        text: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::TextThenToolCalls(text.into(), vec![single_call(id, name, arguments)])
    }
}

fn single_call(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> ToolCall {
    ToolCall { id: id.into(), name: name.into(), arguments: arguments.to_string() }
}

fn text_deltas(text: &str) -> Vec<Result<ChatChunk, ModelError>> {
    text.split_inclusive(' ').map(|word| Ok(ChatChunk::TextDelta(word.to_string()))).collect()
}

fn tool_call_deltas(calls: Vec<ToolCall>) -> Vec<Result<ChatChunk, ModelError>> {
    let mut chunks: Vec<_> = calls
        .into_iter()
        .enumerate()
        .map(|(index, call)| {
            Ok(ChatChunk::ToolCallDelta { index, id: Some(call.id), name: Some(call.name), arguments: call.arguments })
        })
        .collect();
    chunks.push(Ok(ChatChunk::Finish(FinishReason::ToolCalls)));
    chunks
}

// A test that panicked while holding a lock must not hide the script from
// the tests that run after it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`ChatModel`] that replays scripted turns in order and records every
/// request it receives.
#[derive(Debug, Default)]
pub struct MockChatModel {
    turns: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    pub fn new(turns: impl IntoIterator<Item = MockTurn>) -> Self {
        Self { turns: Mutex::new(turns.into_iter().collect()), requests: Mutex::default() }
    }

    /// Queue another turn.
    pub fn push(&self, turn: MockTurn) {
        lock(&self.turns).push_back(turn);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, ModelError> {
        lock(&self.requests).push(request);
        let turn = lock(&self.turns).pop_front().ok_or_else(|| ModelError::Mock("no scripted turn left".into()))?;

        let chunks = match turn {
            MockTurn::Text(text) => {
                let mut chunks = text_deltas(&text);
                chunks.push(Ok(ChatChunk::Finish(FinishReason::Stop)));
                chunks
            }
            MockTurn::ToolCalls(calls) => tool_call_deltas(calls),
            MockTurn::TextThenToolCalls(text, calls) => {
                let mut chunks = text_deltas(&text);
                chunks.extend(tool_call_deltas(calls));
                chunks
            }
            MockTurn::Fail(message) => return Err(ModelError::Mock(message)),
            MockTurn::TextThenFail(text, message) => {
                let mut chunks = text_deltas(&text);
                chunks.push(Err(ModelError::Mock(message)));
                chunks
            }
        };

        Ok(Box::pin(stream::iter(chunks)))
    }
}
