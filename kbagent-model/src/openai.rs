//! OpenAI-compatible chat-completions client.
//!
//! Works against any server exposing `POST {base_url}/chat/completions` with
//! server-sent-event streaming (OpenAI, Azure-style gateways, vLLM, Ollama).
//!
//! # Example
//!
//! ```rust,ignore
//! use kbagent_model::openai::{OpenAiCompatibleModel, OpenAiConfig};
//!
//! let model = OpenAiCompatibleModel::new(
//!     OpenAiConfig::new("https://api.openai.com/v1", "gpt-4o-mini")
//!         .with_api_key(std::env::var("CHAT_API_KEY")?),
//! )?;
//! ```

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::ModelError;
use crate::model::ChatModel;
use crate::types::{
    ChatChunk, ChatMessage, ChatRequest, ChatStream, Role, ToolCall, ToolDeclaration,
};

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default API base, including the version segment.
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for [`OpenAiCompatibleModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
            timeout: None,
        }
    }
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), ..Self::default() }
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

/// Streaming client for OpenAI-compatible chat-completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    config: OpenAiConfig,
    url: String,
}

impl OpenAiCompatibleModel {
    pub fn new(config: OpenAiConfig) -> Result<Self, ModelError> {
        if config.model.trim().is_empty() {
            return Err(ModelError::InvalidConfig("chat model must not be empty".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ModelError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self { client, config, url })
    }

    /// The endpoint every request is sent to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, ModelError> {
        let model = self.config.model.clone();
        let body = WireRequest::new(&model, &request);
        debug!(
            model = %model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "sending chat request"
        );

        let mut http = self.client.post(&self.url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = http.send().await.map_err(|e| {
            error!(error = %e, "chat request failed");
            ModelError::Transport { model: model.clone(), message: e.to_string() }
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<WireErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "chat API error");
            return Err(ModelError::Http { model, status: status.as_u16(), message });
        }

        let mut events = response.bytes_stream().eventsource();
        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ModelError::Stream { model: model.clone(), message: e.to_string() })?;
                let data = event.data.trim();
                if data == "[DONE]" {
                    break;
                }
                if data.is_empty() {
                    continue;
                }

                let chunk: WireChunk = serde_json::from_str(data).map_err(|e| ModelError::Stream {
                    model: model.clone(),
                    message: format!("failed to decode chunk: {e}"),
                })?;

                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                        yield ChatChunk::TextDelta(content);
                    }
                    for call in choice.delta.tool_calls.unwrap_or_default() {
                        let (name, arguments) = match call.function {
                            Some(f) => (f.name, f.arguments.unwrap_or_default()),
                            None => (None, String::new()),
                        };
                        yield ChatChunk::ToolCallDelta { index: call.index, id: call.id, name, arguments };
                    }
                    if let Some(reason) = choice.finish_reason {
                        yield ChatChunk::Finish(reason.as_str().into());
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// ── Chat completions wire types ────────────────────────────────────

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

impl<'a> WireRequest<'a> {
    fn new(model: &'a str, request: &'a ChatRequest) -> Self {
        Self {
            model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.iter().map(WireTool::from).collect(),
            temperature: request.temperature,
            stream: true,
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        // Assistant turns that only call tools carry `null` content.
        let content = if message.role == Role::Assistant
            && message.content.is_empty()
            && !message.tool_calls.is_empty()
        {
            None
        } else {
            Some(message.content.as_str())
        };
        Self {
            role: message.role,
            content,
            tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: message.tool_call_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: WireFunctionCall<'a>,
}

impl<'a> From<&'a ToolCall> for WireToolCall<'a> {
    fn from(call: &'a ToolCall) -> Self {
        Self {
            id: &call.id,
            r#type: "function",
            function: WireFunctionCall { name: &call.name, arguments: &call.arguments },
        }
    }
}

#[derive(Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireFunctionDecl<'a>,
}

impl<'a> From<&'a ToolDeclaration> for WireTool<'a> {
    fn from(tool: &'a ToolDeclaration) -> Self {
        Self {
            r#type: "function",
            function: WireFunctionDecl {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }
    }
}

#[derive(Serialize)]
struct WireFunctionDecl<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: WireDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Deserialize)]
struct WireToolCallDelta {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireErrorResponse {
    error: WireErrorDetail,
}

#[derive(Deserialize)]
struct WireErrorDetail {
    message: String,
}
