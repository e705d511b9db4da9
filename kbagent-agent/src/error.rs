use kbagent_model::ModelError;
use thiserror::Error;

/// Errors a [`Tool`](crate::Tool) reports. They are handed back to the model
/// as the tool's result rather than failing the turn.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown tool '{0}'")]
    NotFound(String),

    #[error("{0}")]
    Execution(String),
}

/// Errors that end an agent turn.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("no final answer after {0} model calls")]
    StepLimit(usize),

    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
