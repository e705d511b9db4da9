//! Built-in tools.

mod knowledgebase;

pub use knowledgebase::{KNOWLEDGEBASE_SEARCH, KnowledgebaseSearchTool};
