use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use kbagent_model::{
    ChatChunk, ChatMessage, ChatModel, ChatRequest, FinishReason, ModelError,
    OpenAiCompatibleModel, OpenAiConfig,
};
use serde_json::{Value, json};

const TEXT_STREAM: &str = concat!(
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

const TOOL_STREAM: &str = concat!(
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"knowledgebase_search\",\"arguments\":\"\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"query\\\":\"}}]}}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"sky\\\"}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
    "data: [DONE]\n\n",
);

#[derive(Clone, Default)]
struct MockState {
    last_body: Arc<Mutex<Option<Value>>>,
}

async fn completions(State(state): State<MockState>, Json(body): Json<Value>) -> impl IntoResponse {
    *state.last_body.lock().unwrap() = Some(body.clone());
    match body["model"].as_str() {
        Some("rate-limited") => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::CONTENT_TYPE, "application/json")],
            json!({"error": {"message": "slow down"}}).to_string(),
        ),
        Some("tools") => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], TOOL_STREAM.to_string())
        }
        _ => (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], TEXT_STREAM.to_string()),
    }
}

async fn spawn_server() -> (String, MockState, tokio::task::JoinHandle<()>) {
    let state = MockState::default();
    let app = Router::new().route("/v1/chat/completions", post(completions)).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}/v1", addr), state, handle)
}

async fn collect(model: &OpenAiCompatibleModel) -> Vec<ChatChunk> {
    let stream = model
        .stream(ChatRequest::new(vec![ChatMessage::user("hi")]))
        .await
        .expect("stream starts");
    stream.map(|chunk| chunk.expect("chunk")).collect().await
}

#[tokio::test]
async fn streams_text_deltas_until_done() {
    let (base, state, handle) = spawn_server().await;
    let model =
        OpenAiCompatibleModel::new(OpenAiConfig::new(&base, "gpt-4o-mini").with_api_key("sk"))
            .expect("client");

    let chunks = collect(&model).await;

    assert_eq!(
        chunks,
        vec![
            ChatChunk::TextDelta("Hello".into()),
            ChatChunk::TextDelta(" world".into()),
            ChatChunk::Finish(FinishReason::Stop),
        ]
    );
    let body = state.last_body.lock().unwrap().clone().expect("request body");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "user");
    handle.abort();
}

#[tokio::test]
async fn streams_tool_call_fragments() {
    let (base, _state, handle) = spawn_server().await;
    let model = OpenAiCompatibleModel::new(OpenAiConfig::new(&base, "tools")).expect("client");

    let chunks = collect(&model).await;

    let arguments: String = chunks
        .iter()
        .filter_map(|c| match c {
            ChatChunk::ToolCallDelta { index: 0, arguments, .. } => Some(arguments.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(arguments, r#"{"query":"sky"}"#);
    assert!(matches!(
        &chunks[0],
        ChatChunk::ToolCallDelta { id: Some(id), name: Some(name), .. }
            if id == "call_1" && name == "knowledgebase_search"
    ));
    assert_eq!(chunks.last(), Some(&ChatChunk::Finish(FinishReason::ToolCalls)));
    handle.abort();
}

#[tokio::test]
async fn error_status_is_reported_before_streaming() {
    let (base, _state, handle) = spawn_server().await;
    let model = OpenAiCompatibleModel::new(OpenAiConfig::new(&base, "rate-limited")).expect("client");

    let err = match model.stream(ChatRequest::new(vec![ChatMessage::user("hi")])).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };

    assert_eq!(err, ModelError::Http { model: "rate-limited".into(), status: 429, message: "slow down".into() });
    handle.abort();
}
