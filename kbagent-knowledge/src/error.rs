//! Error types for the `kbagent-knowledge` crate.
//!
//! Remote failures are normalized into three shapes: [`EmbeddingError`] for
//! the embedding API, [`BackendError`] for a vector-store backend, and
//! [`StoreError`], which tags either of them with the knowledgebase action
//! that was running when it happened.

use std::fmt;

use thiserror::Error;

/// gRPC `ALREADY_EXISTS`.
const GRPC_ALREADY_EXISTS: i32 = 6;

/// HTTP `409 Conflict`.
const HTTP_CONFLICT: i32 = 409;

/// Errors produced by an [`EmbeddingProvider`](crate::EmbeddingProvider).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    /// The embedding API answered with a status of 400 or above.
    #[error("error embedding request with model {model} -> {status} {message}")]
    Http {
        /// The embedding model the request was sent to.
        model: String,
        /// HTTP status code of the response.
        status: u16,
        /// The provider's error message, or the raw response body.
        message: String,
    },

    /// The request never produced a response (connection, TLS, timeout).
    #[error("error embedding request with model {model}: {message}")]
    Transport {
        /// The embedding model the request was sent to.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The API answered successfully but the body held no usable embedding.
    #[error("malformed embedding response from model {model}: {message}")]
    MalformedResponse {
        /// The embedding model the request was sent to.
        model: String,
        /// A description of what was wrong with the body.
        message: String,
    },
}

impl EmbeddingError {
    /// HTTP status code, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// An error reported by a [`VectorStore`](crate::VectorStore) backend.
///
/// `status` carries the provider's status code when it sent one: a gRPC code
/// for Qdrant, or an HTTP status for REST backends.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    /// The backend that produced the error.
    pub backend: &'static str,
    /// Provider status code, if any.
    pub status: Option<i32>,
    /// Provider error message.
    pub message: String,
}

impl BackendError {
    /// Create an error without a status code.
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self { backend, status: None, message: message.into() }
    }

    /// Create an error carrying a provider status code.
    pub fn with_status(backend: &'static str, status: i32, message: impl Into<String>) -> Self {
        Self { backend, status: Some(status), message: message.into() }
    }

    fn status_prefix(&self) -> String {
        self.status.map(|status| format!("{status} - ")).unwrap_or_default()
    }

    /// Whether this error signals that the target already exists.
    ///
    /// Qdrant reports a lost creation race either as `ALREADY_EXISTS` or as a
    /// generic error whose message says so, so both are checked.
    pub fn is_conflict(&self) -> bool {
        if matches!(self.status, Some(GRPC_ALREADY_EXISTS) | Some(HTTP_CONFLICT)) {
            return true;
        }
        let message = self.message.to_lowercase();
        message.contains("already exists") || message.contains("conflict")
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}{}", self.backend, self.status_prefix(), self.message)
    }
}

impl std::error::Error for BackendError {}

/// The knowledgebase action an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Adding,
    Searching,
    Deleting,
    CreatingCollection,
    DeletingCollection,
}

impl fmt::Display for StoreAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Adding => "adding",
            Self::Searching => "searching",
            Self::Deleting => "deleting",
            Self::CreatingCollection => "creating collection",
            Self::DeletingCollection => "deleting collection",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`Knowledgebase`](crate::Knowledgebase) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding the text failed.
    #[error("embedding failed while {action}: {source}")]
    Embedding {
        action: StoreAction,
        #[source]
        source: EmbeddingError,
    },

    /// The vector-store backend rejected the call.
    #[error("{} error for {action}: {}{}", .source.backend, .source.status_prefix(), .source.message)]
    Backend {
        action: StoreAction,
        #[source]
        source: BackendError,
    },

    /// Every attempt to provision the collection lost a creation race.
    #[error("collection `{collection}` still conflicted after {attempts} attempts")]
    CollectionConflict {
        collection: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// The knowledgebase was configured with invalid parameters.
    #[error("invalid knowledgebase configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// The action that failed, where there is one.
    pub fn action(&self) -> Option<StoreAction> {
        match self {
            Self::Embedding { action, .. } | Self::Backend { action, .. } => Some(*action),
            Self::CollectionConflict { .. } => Some(StoreAction::CreatingCollection),
            Self::InvalidConfig(_) => None,
        }
    }

    /// The remote status code behind this error, if the remote sent one.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Embedding { source, .. } => source.status().map(i32::from),
            Self::Backend { source, .. } | Self::CollectionConflict { source, .. } => source.status,
            Self::InvalidConfig(_) => None,
        }
    }
}

/// A convenience result type for knowledgebase operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detected_from_grpc_code() {
        let err = BackendError::with_status("qdrant", 6, "boom");
        assert!(err.is_conflict());
    }

    #[test]
    fn conflict_detected_from_message() {
        let err = BackendError::with_status("qdrant", 3, "Wrong input: Collection `kb` already exists!");
        assert!(err.is_conflict());
        assert!(BackendError::new("qdrant", "409 Conflict").is_conflict());
        assert!(!BackendError::new("qdrant", "connection refused").is_conflict());
    }

    #[test]
    fn backend_error_display_prefixes_status_when_present() {
        assert_eq!(
            BackendError::with_status("qdrant", 5, "Not found").to_string(),
            "qdrant error: 5 - Not found"
        );
        assert_eq!(BackendError::new("memory", "boom").to_string(), "memory error: boom");
    }

    #[test]
    fn store_error_display_includes_action_and_status() {
        let err = StoreError::Backend {
            action: StoreAction::Searching,
            source: BackendError::with_status("qdrant", 5, "Not found: Collection `kb` doesn't exist!"),
        };
        assert_eq!(
            err.to_string(),
            "qdrant error for searching: 5 - Not found: Collection `kb` doesn't exist!"
        );
        assert_eq!(err.status(), Some(5));
    }

    #[test]
    fn embedding_error_display_mirrors_provider_format() {
        let err = EmbeddingError::Http {
            model: "text-embedding-3-large".into(),
            status: 401,
            message: "unauthorized".into(),
        };
        assert_eq!(
            err.to_string(),
            "error embedding request with model text-embedding-3-large -> 401 unauthorized"
        );

        let wrapped = StoreError::Embedding { action: StoreAction::Adding, source: err };
        assert_eq!(wrapped.status(), Some(401));
        assert_eq!(wrapped.action(), Some(StoreAction::Adding));
    }
}
