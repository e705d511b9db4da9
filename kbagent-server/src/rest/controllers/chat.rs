use std::error::Error;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use kbagent_agent::AgentEvent;
use serde::Deserialize;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::rest::AppState;

/// Header carrying the conversation id, on the request and the response.
pub const THREAD_ID_HEADER: &str = "thread-id";

#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub inputs: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

impl ChatBody {
    /// `inputs`, else `input`, else empty.
    pub fn text(self) -> String {
        self.inputs
            .filter(|s| !s.is_empty())
            .or(self.input.filter(|s| !s.is_empty()))
            .unwrap_or_default()
    }
}

fn thread_id(headers: &HeaderMap) -> String {
    headers
        .get(THREAD_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// The error followed by every cause not already part of its message.
pub(crate) fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// `POST /`: run one agent turn and answer with its final reply.
///
/// Text the model emits alongside a tool call is not part of the reply. Any
/// failure before the agent finishes answers 500 with the error chain.
pub async fn chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let thread_id = thread_id(&headers);
    let thread_header = match HeaderValue::from_str(&thread_id) {
        Ok(value) => value,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid thread id: {e}")).into_response(),
    };
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        ChatBody::default()
    } else {
        match serde_json::from_slice::<ChatBody>(&body) {
            Ok(body) => body,
            Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid request body: {e}")).into_response(),
        }
    };
    let input = body.text();

    let span = info_span!("chat", thread_id = %thread_id);
    info!(parent: &span, chars = input.len(), "received message");
    let mut events = state.agent.run(thread_id, input);

    let mut reply = None;
    while let Some(event) = events.next().instrument(span.clone()).await {
        match event {
            Ok(AgentEvent::Done { text }) => {
                reply = Some(text);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let message = error_chain(&e);
                error!(parent: &span, error = %message, "agent failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
            }
        }
    }
    let Some(reply) = reply else {
        error!(parent: &span, "agent stopped without a reply");
        return (StatusCode::INTERNAL_SERVER_ERROR, "agent stopped without a reply").into_response();
    };
    info!(parent: &span, chars = reply.len(), "replied");

    let mut response = Response::new(Body::from(reply));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(THREAD_ID_HEADER, thread_header);
    response
}
