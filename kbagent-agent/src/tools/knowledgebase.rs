//! Agentic retrieval: lets the model search the knowledgebase itself.
//!
//! The model calls the tool with:
//!
//! ```json
//! { "query": "What colour is the sky?", "limit": 3, "score_threshold": 0.4 }
//! ```

use async_trait::async_trait;
use kbagent_knowledge::document::{KEY_FIELD, TEXT_FIELD};
use kbagent_knowledge::{Knowledgebase, SearchOptions};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::ToolError;
use crate::tool::Tool;

/// Name the model calls the tool by.
pub const KNOWLEDGEBASE_SEARCH: &str = "knowledgebase_search";

/// A [`Tool`] that searches a [`Knowledgebase`].
///
/// Accepts a required `query` and optional `limit` and `score_threshold`
/// overrides; anything not given falls back to the knowledgebase settings.
pub struct KnowledgebaseSearchTool {
    knowledgebase: Knowledgebase,
}

impl KnowledgebaseSearchTool {
    pub fn new(knowledgebase: Knowledgebase) -> Self {
        Self { knowledgebase }
    }
}

#[async_trait]
impl Tool for KnowledgebaseSearchTool {
    fn name(&self) -> &str {
        KNOWLEDGEBASE_SEARCH
    }

    fn description(&self) -> &str {
        "Search the knowledgebase for stored documents relevant to a query"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to find similar documents for"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of documents to return"
                },
                "score_threshold": {
                    "type": "number",
                    "description": "Minimum similarity a document must reach"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing required 'query' parameter".into()))?;

        let mut options = SearchOptions::default();
        if let Some(limit) = args.get("limit").and_then(Value::as_u64) {
            options = options.limit(limit as usize);
        }
        if let Some(threshold) = args.get("score_threshold").and_then(Value::as_f64) {
            options = options.score_threshold(threshold as f32);
        }

        info!(query, limit = ?options.limit, threshold = ?options.score_threshold, "knowledgebase_search tool called");

        let results = self.knowledgebase.search_with(query, options).await.map_err(|e| {
            error!(error = %e, "knowledgebase_search failed");
            ToolError::Execution(format!("knowledgebase search failed: {e}"))
        })?;

        let documents: Vec<Value> = results
            .into_iter()
            .map(|result| {
                let text = result.text().unwrap_or_default().to_string();
                let mut metadata = result.payload;
                metadata.remove(TEXT_FIELD);
                metadata.remove(KEY_FIELD);
                json!({
                    "key": result.key,
                    "text": text,
                    "similarity": result.similarity,
                    "metadata": metadata,
                })
            })
            .collect();
        Ok(Value::Array(documents))
    }
}
