//! Bulk loading of a directory of text files into a knowledgebase.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::document::Metadata;
use crate::error::StoreError;
use crate::knowledgebase::Knowledgebase;

/// Metadata field holding the source file name.
pub const DOCUMENT_NAME_FIELD: &str = "documentName";

/// Documents loaded at once when no other bound is given.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Failures while loading documents from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The directory itself could not be listed.
    #[error("failed to list documents in {}: {source}", .dir.display())]
    ListDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be read as UTF-8 text.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The knowledgebase rejected the document.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A document that was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub name: String,
    pub key: String,
}

/// A document that could not be stored.
#[derive(Debug)]
pub struct FailedDocument {
    pub name: String,
    pub error: LoadError,
}

/// Outcome of [`load_directory`]; every listed file ends up in exactly one
/// of the two lists.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub stored: Vec<StoredDocument>,
    pub failed: Vec<FailedDocument>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.stored.len() + self.failed.len()
    }
}

/// List the regular files of `dir`, sorted by name.
pub async fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let list_err = |source| LoadError::ListDirectory { dir: dir.to_path_buf(), source };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let file_type = entry.file_type().await.map_err(list_err)?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

async fn load_one(kb: &Knowledgebase, path: PathBuf) -> Result<StoredDocument, FailedDocument> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(source) => return Err(FailedDocument { name, error: LoadError::Read { path, source } }),
    };

    let key = Uuid::new_v4().to_string();
    let mut metadata = Metadata::new();
    metadata.insert(DOCUMENT_NAME_FIELD.to_string(), Value::String(name.clone()));

    match kb.add(&key, &text, metadata).await {
        Ok(()) => {
            debug!(document = %name, key = %key, "stored document");
            Ok(StoredDocument { name, key })
        }
        Err(e) => Err(FailedDocument { name, error: e.into() }),
    }
}

/// Store every regular file of `dir` in `kb`, at most `concurrency` at once.
///
/// Each file is added under a fresh UUID v4 key with its file name as the
/// `documentName` metadata. A file that fails is recorded in the report and
/// does not stop the others. Only a failure to list `dir` is returned as an
/// error.
pub async fn load_directory(
    kb: &Knowledgebase,
    dir: impl AsRef<Path>,
    concurrency: usize,
) -> Result<LoadReport, LoadError> {
    let files = list_documents(dir.as_ref()).await?;
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    info!(collection = %kb.collection(), count = files.len(), documents = %names.join(", "), "storing documents");

    let outcomes: Vec<_> = stream::iter(files)
        .map(|path| load_one(kb, path))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = LoadReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(stored) => report.stored.push(stored),
            Err(failed) => {
                error!(document = %failed.name, error = %failed.error, "failed to store document");
                report.failed.push(failed);
            }
        }
    }
    report.stored.sort_by(|a, b| a.name.cmp(&b.name));
    report.failed.sort_by(|a, b| a.name.cmp(&b.name));

    info!(stored = report.stored.len(), failed = report.failed.len(), "finished storing documents");
    Ok(report)
}
