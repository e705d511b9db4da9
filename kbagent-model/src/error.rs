use thiserror::Error;

/// Errors produced by a [`ChatModel`](crate::ChatModel).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// The chat API answered with a status of 400 or above.
    #[error("chat request with model {model} failed -> {status} {message}")]
    Http { model: String, status: u16, message: String },

    /// The request never produced a response.
    #[error("chat request with model {model} failed: {message}")]
    Transport { model: String, message: String },

    /// The response stream broke or carried an event that could not be decoded.
    #[error("chat stream from model {model} failed: {message}")]
    Stream { model: String, message: String },

    /// The client was configured with invalid parameters.
    #[error("invalid chat model configuration: {0}")]
    InvalidConfig(String),

    /// A scripted model ran out of turns or was told to fail.
    #[error("mock model: {0}")]
    Mock(String),
}

impl ModelError {
    /// HTTP status code, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
