use std::sync::Arc;

use async_trait::async_trait;
use kbagent_agent::{DEFAULT_PROMPT, KnowledgebaseContext, PromptHook};
use kbagent_knowledge::{
    EmbeddingError, EmbeddingProvider, InMemoryVectorStore, Knowledgebase, KnowledgebaseConfig,
    Metadata, MockEmbeddingProvider,
};
use kbagent_model::{ChatMessage, Role};

struct DownEmbedder;

#[async_trait]
impl EmbeddingProvider for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Http {
            model: "text-embedding-3-large".into(),
            status: 503,
            message: "service unavailable".into(),
        })
    }

    fn model(&self) -> &str {
        "text-embedding-3-large"
    }
}

fn knowledgebase(embedder: Arc<dyn EmbeddingProvider>) -> Knowledgebase {
    Knowledgebase::new(KnowledgebaseConfig::default(), embedder, Arc::new(InMemoryVectorStore::new()))
}

#[tokio::test]
async fn found_documents_are_listed_with_scores() {
    let kb = knowledgebase(Arc::new(MockEmbeddingProvider::new(256)));
    kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap();
    let hook = KnowledgebaseContext::new(kb);

    let messages = hook.messages(&[ChatMessage::user("sky color")]).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    let system = &messages[0].content;
    let context = system.strip_prefix(DEFAULT_PROMPT).expect("prompt comes first");
    assert!(context.starts_with("Relevant information from previous conversations:\n- "));
    assert!(context.contains("The sky is blue"));
    assert!(context.contains("(score: "));
    assert!(context.ends_with(")\n"));
    assert_eq!(messages[1], ChatMessage::user("sky color"));
}

#[tokio::test]
async fn no_match_gives_the_bare_prompt() {
    let kb = knowledgebase(Arc::new(MockEmbeddingProvider::new(256)));
    kb.add("doc-1", "The sky is blue", Metadata::new()).await.unwrap();
    let hook = KnowledgebaseContext::with_prompt(kb, "Be brief.");

    let messages = hook.messages(&[ChatMessage::user("quarterly invoice totals")]).await;

    assert_eq!(messages[0], ChatMessage::system("Be brief."));
}

#[tokio::test]
async fn search_failure_degrades_to_prompt_with_error() {
    let hook = KnowledgebaseContext::new(knowledgebase(Arc::new(DownEmbedder)));
    let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("ok"), ChatMessage::user("now")];

    let messages = hook.messages(&history).await;

    assert_eq!(messages.len(), 4);
    let system = &messages[0].content;
    assert!(system.starts_with(DEFAULT_PROMPT));
    assert!(system.contains(" Could not retrieve documents from store: "));
    assert!(system.contains("503 service unavailable"));
    assert_eq!(&messages[1..], &history[..]);
}

#[tokio::test]
async fn missing_collection_degrades_too() {
    let hook = KnowledgebaseContext::new(knowledgebase(Arc::new(MockEmbeddingProvider::new(32))));

    let messages = hook.messages(&[ChatMessage::user("anything")]).await;

    assert!(messages[0].content.contains("Could not retrieve documents from store"));
}
