//! Embedding provider calling a model-scoped embeddings endpoint over HTTP.
//!
//! Requests go to `{base_url}/models/{model}/v1/embeddings` with the body
//! `{"input": text}`; the response is expected to carry
//! `{"data": [{"embedding": [...]}]}`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info_span};

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, StoreError};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Default base URL of the embeddings gateway.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com";

/// Request header carrying the workspace name, when one is configured.
const WORKSPACE_HEADER: &str = "X-Workspace";

/// The API family of the embedding model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbeddingModelType {
    #[default]
    OpenAi,
}

impl FromStr for EmbeddingModelType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            other => {
                Err(StoreError::InvalidConfig(format!("unsupported embedding model type '{other}'")))
            }
        }
    }
}

/// Settings for [`HttpEmbeddingModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub model_type: EmbeddingModelType,
    pub api_key: Option<String>,
    pub workspace: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            model_type: EmbeddingModelType::OpenAi,
            api_key: None,
            workspace: None,
            timeout: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), ..Self::default() }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_model_type(mut self, model_type: EmbeddingModelType) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An [`EmbeddingProvider`] that performs one HTTP request per call.
///
/// # Example
///
/// ```rust,ignore
/// use kbagent_knowledge::http_embedding::{EmbeddingConfig, HttpEmbeddingModel};
///
/// let model = HttpEmbeddingModel::new(
///     EmbeddingConfig::new("https://run.example.com/my-workspace", "text-embedding-3-large")
///         .with_api_key("sk-..."),
/// )?;
/// let embedding = model.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpEmbeddingModel {
    client: reqwest::Client,
    config: EmbeddingConfig,
    url: String,
}

impl HttpEmbeddingModel {
    /// Create a new embedding client.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if the model name is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: EmbeddingConfig) -> Result<Self, StoreError> {
        if config.model.trim().is_empty() {
            return Err(StoreError::InvalidConfig("embedding model must not be empty".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            StoreError::InvalidConfig(format!("failed to build embedding HTTP client: {e}"))
        })?;

        let url =
            format!("{}/models/{}/v1/embeddings", config.base_url.trim_end_matches('/'), config.model);
        Ok(Self { client, config, url })
    }

    /// The endpoint every request is sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, message: String) -> EmbeddingError {
        EmbeddingError::Transport { model: self.config.model.clone(), message }
    }

    async fn run(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest { input: text });
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        if let Some(workspace) = &self.config.workspace {
            request = request.header(WORKSPACE_HEADER, workspace);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "embedding request failed");
            self.transport_error(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "embedding API error");
            return Err(EmbeddingError::Http {
                model: self.config.model.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            EmbeddingError::MalformedResponse {
                model: self.config.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        body.data.into_iter().next().map(|d| d.embedding).ok_or_else(|| {
            EmbeddingError::MalformedResponse {
                model: self.config.model.clone(),
                message: "response contained no embeddings".into(),
            }
        })
    }
}

// ── Embeddings API request/response types ──────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let span = info_span!(
            "embedding",
            model.name = %self.config.model,
            model.kind = ?self.config.model_type,
            text_len = text.len(),
        );
        async {
            let embedding = self.run(text).await?;
            debug!(dimensions = embedding.len(), "embedded text");
            Ok(embedding)
        }
        .instrument(span)
        .await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
