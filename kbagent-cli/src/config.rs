//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it; flags win. A `.env` file is loaded by the binaries before
//! parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};
use kbagent_agent::DEFAULT_MAX_STEPS;
use kbagent_knowledge::config::{DEFAULT_COLLECTION, DEFAULT_LIMIT, DEFAULT_SCORE_THRESHOLD};
use kbagent_knowledge::http_embedding::{DEFAULT_EMBEDDING_BASE_URL, DEFAULT_EMBEDDING_MODEL};
use kbagent_knowledge::loader::DEFAULT_CONCURRENCY;
use kbagent_knowledge::qdrant::DEFAULT_QDRANT_URL;
use kbagent_knowledge::{Distance, EmbeddingModelType};
use kbagent_model::openai::{DEFAULT_CHAT_BASE_URL, DEFAULT_CHAT_MODEL};
use kbagent_server::config::{DEFAULT_HOST, DEFAULT_PORT};
use kbagent_telemetry::{LogFormat, TelemetryConfig};

/// Which vector store holds the knowledgebase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    #[default]
    Qdrant,
    /// In-process and empty at start; lost on exit.
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Vector store backend
    #[arg(long = "store", env = "KBAGENT_STORE", value_enum, default_value_t = StoreBackend::Qdrant)]
    pub backend: StoreBackend,

    /// Qdrant gRPC endpoint
    #[arg(long, env = "QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    pub qdrant_url: String,

    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    #[arg(long, env = "QDRANT_COLLECTION_NAME", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Distance metric used when the collection is created
    #[arg(long, env = "QDRANT_DISTANCE", default_value = "cosine")]
    pub distance: Distance,

    /// Minimum similarity for search results
    #[arg(long, env = "QDRANT_SCORE_THRESHOLD", default_value_t = DEFAULT_SCORE_THRESHOLD)]
    pub score_threshold: f32,

    /// Maximum number of search results
    #[arg(long, env = "QDRANT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Clone, Args)]
pub struct EmbeddingArgs {
    #[arg(long, env = "QDRANT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// API family of the embedding model; only `openai` is supported
    #[arg(long, env = "QDRANT_EMBEDDING_MODEL_TYPE", default_value = "openai")]
    pub embedding_model_type: EmbeddingModelType,

    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_EMBEDDING_BASE_URL)]
    pub embedding_base_url: String,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Sent as the `X-Workspace` header
    #[arg(long, env = "EMBEDDING_WORKSPACE")]
    pub embedding_workspace: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_CHAT_BASE_URL)]
    pub chat_base_url: String,

    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// Model calls allowed per turn
    #[arg(long, env = "KBAGENT_MAX_STEPS", default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
}

#[derive(Debug, Clone, Args)]
pub struct ListenArgs {
    #[arg(long, env = "BL_SERVER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "BL_SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Request timeout for the embedding, chat and Qdrant clients
    #[arg(long, env = "KBAGENT_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    /// Log filter directive, e.g. `info,kbagent_knowledge=debug`
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,

    #[arg(long, env = "KBAGENT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

impl CommonArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        let config = TelemetryConfig::new(self.log_format);
        match &self.log_filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}

/// `kbagent`: serve the chat agent over HTTP.
#[derive(Debug, Clone, Parser)]
#[command(name = "kbagent", version, about = "Retrieval-augmented chat agent backed by a Qdrant knowledgebase")]
pub struct ServeArgs {
    #[command(flatten)]
    pub listen: ListenArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    #[command(flatten)]
    pub chat: ChatArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// `fill-knowledgebase`: store every file of a directory.
#[derive(Debug, Clone, Parser)]
#[command(name = "fill-knowledgebase", version, about = "Load a directory of documents into the knowledgebase")]
pub struct FillArgs {
    /// Directory whose files are stored, one entry per file
    #[arg(default_value = "documents")]
    pub dir: PathBuf,

    /// Documents processed at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}
