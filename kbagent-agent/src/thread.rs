//! In-process conversation memory keyed by thread id.

use std::collections::HashMap;

use kbagent_model::ChatMessage;
use tokio::sync::RwLock;

/// Message history per thread. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct ThreadStore {
    threads: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread's messages so far; empty for an unknown thread.
    pub async fn history(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads.read().await.get(thread_id).cloned().unwrap_or_default()
    }

    /// Append a finished turn to the thread, creating it if needed.
    pub async fn append(&self, thread_id: &str, messages: Vec<ChatMessage>) {
        self.threads.write().await.entry(thread_id.to_string()).or_default().extend(messages);
    }

    pub async fn clear(&self, thread_id: &str) {
        self.threads.write().await.remove(thread_id);
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}
