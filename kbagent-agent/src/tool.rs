//! Tools the model can call, and the registry that dispatches them.

use std::sync::Arc;

use async_trait::async_trait;
use kbagent_model::{ToolCall, ToolDeclaration};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::ToolError;

/// A function the model may invoke during a turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The toolset of an agent, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any registered tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    /// Run `call` and return what the model should see as its result.
    ///
    /// Failures become `{"error": "..."}` so the model can react to them.
    pub async fn execute(&self, call: &ToolCall) -> Value {
        let outcome = match self.get(&call.name) {
            None => Err(ToolError::NotFound(call.name.clone())),
            Some(tool) => match parse_arguments(&call.arguments) {
                Ok(args) => tool.execute(args).await,
                Err(e) => Err(e),
            },
        };

        match outcome {
            Ok(value) => {
                debug!(tool = %call.name, call_id = %call.id, "tool call succeeded");
                value
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// Empty argument strings count as `{}`.
fn parse_arguments(arguments: &str) -> Result<Value, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
