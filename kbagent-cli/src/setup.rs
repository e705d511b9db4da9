//! Wiring configuration into running components.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use kbagent_agent::{Agent, KnowledgebaseContext, KnowledgebaseSearchTool};
use kbagent_knowledge::{
    EmbeddingConfig, HttpEmbeddingModel, InMemoryVectorStore, Knowledgebase, KnowledgebaseConfig,
    QdrantStoreConfig, QdrantVectorStore, VectorStore,
};
use kbagent_model::{OpenAiCompatibleModel, OpenAiConfig};
use kbagent_server::ServerConfig;
use tracing::info;

use crate::config::{ChatArgs, EmbeddingArgs, ListenArgs, StoreArgs, StoreBackend};

impl StoreArgs {
    pub fn knowledgebase_config(&self) -> anyhow::Result<KnowledgebaseConfig> {
        KnowledgebaseConfig::builder()
            .collection(&self.collection)
            .distance(self.distance)
            .score_threshold(self.score_threshold)
            .limit(self.limit)
            .build()
            .context("invalid knowledgebase settings")
    }

    pub fn vector_store(&self, timeout: Option<Duration>) -> anyhow::Result<Arc<dyn VectorStore>> {
        match self.backend {
            StoreBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
            StoreBackend::Qdrant => {
                let mut config = QdrantStoreConfig::new(&self.qdrant_url);
                if let Some(key) = &self.qdrant_api_key {
                    config = config.with_api_key(key.clone());
                }
                if let Some(timeout) = timeout {
                    config = config.with_timeout(timeout);
                }
                let store = QdrantVectorStore::new(config)
                    .with_context(|| format!("failed to create Qdrant client for {}", self.qdrant_url))?;
                Ok(Arc::new(store))
            }
        }
    }
}

impl EmbeddingArgs {
    pub fn embedding_config(&self, timeout: Option<Duration>) -> EmbeddingConfig {
        let mut config = EmbeddingConfig::new(&self.embedding_base_url, &self.embedding_model)
            .with_model_type(self.embedding_model_type);
        if let Some(key) = &self.embedding_api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(workspace) = &self.embedding_workspace {
            config = config.with_workspace(workspace.clone());
        }
        if let Some(timeout) = timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

impl ChatArgs {
    pub fn openai_config(&self, timeout: Option<Duration>) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(&self.chat_base_url, &self.chat_model);
        if let Some(key) = &self.chat_api_key {
            config = config.with_api_key(key.clone());
        }
        if let Some(timeout) = timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

impl ListenArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.host, self.port)
    }
}

pub fn build_knowledgebase(
    store: &StoreArgs,
    embedding: &EmbeddingArgs,
    timeout: Option<Duration>,
) -> anyhow::Result<Knowledgebase> {
    let config = store.knowledgebase_config()?;
    let embedder = HttpEmbeddingModel::new(embedding.embedding_config(timeout))
        .context("failed to create embedding client")?;
    let vector_store = store.vector_store(timeout)?;
    info!(
        backend = vector_store.backend(),
        collection = %config.collection,
        embedding_model = %embedding.embedding_model,
        "knowledgebase configured"
    );
    Ok(Knowledgebase::new(config, Arc::new(embedder), vector_store))
}

/// The chat agent: knowledgebase context in the prompt plus the search tool.
pub fn build_agent(
    knowledgebase: Knowledgebase,
    chat: &ChatArgs,
    timeout: Option<Duration>,
) -> anyhow::Result<Agent> {
    let model = OpenAiCompatibleModel::new(chat.openai_config(timeout))
        .context("failed to create chat model client")?;
    info!(model = %chat.chat_model, url = model.url(), "chat model configured");

    Agent::builder(Arc::new(model))
        .hook(Arc::new(KnowledgebaseContext::new(knowledgebase.clone())))
        .tool(Arc::new(KnowledgebaseSearchTool::new(knowledgebase)))
        .max_steps(chat.max_steps)
        .build()
        .context("invalid agent settings")
}
