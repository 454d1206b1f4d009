//! `POST /api/chat`: forwards a conversation upstream and streams the reply.
//!
//! The response is framed one of two ways, chosen by the `Accept` header:
//!
//! - `text/event-stream`: SSE with `delta`, `done` and `error` events. Every
//!   stream ends with exactly one `done` or `error`.
//! - anything else: `text/plain; charset=utf-8`, chunked. A clean end of the
//!   body means success; an upstream failure aborts the body mid-transfer so
//!   the client sees a read error instead of a clean EOF.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use brain_ai::{Message, MessageEvent, MessageEventStream, Outcome, Role, TextCollector};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::prompt::{self, MAX_INPUT_BYTES};
use crate::state::AppState;

/// Register the chat route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

/// Request body: `{"messages": [{"role": ..., "content": ...}, ...]}`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// Response framing negotiated from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    PlainText,
    EventStream,
}

impl Framing {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_sse = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/event-stream"))
            .unwrap_or(false);
        if wants_sse {
            Framing::EventStream
        } else {
            Framing::PlainText
        }
    }
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::invalid(format!("malformed request body: {e}")))?;
    let user_input = latest_user_input(&request.messages)?.to_owned();

    let request_id = Uuid::new_v4();
    let framing = Framing::from_headers(&headers);
    debug!(
        %request_id,
        messages = request.messages.len(),
        input_len = user_input.len(),
        ?framing,
        "chat request"
    );

    let context = prompt::build_context(&user_input, request.messages);
    let events = state
        .provider
        .stream(&state.model, &context, &state.options)
        .await?;

    info!(%request_id, model = %state.model.id, "streaming completion");

    let response = match framing {
        Framing::EventStream => Sse::new(sse_events(events, request_id))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Framing::PlainText => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(plain_chunks(events, request_id)),
        )
            .into_response(),
    };
    Ok(response)
}

/// Validate the conversation and return the content of its last message.
pub fn latest_user_input(messages: &[Message]) -> Result<&str, ProxyError> {
    let last = messages
        .last()
        .ok_or_else(|| ProxyError::invalid("messages must not be empty"))?;

    if last.role != Role::User {
        return Err(ProxyError::invalid(format!(
            "last message must have role \"user\", got \"{}\"",
            last.role.as_str()
        )));
    }
    if last.content.len() > MAX_INPUT_BYTES {
        return Err(ProxyError::invalid(format!(
            "input too large ({} bytes); maximum is {} bytes",
            last.content.len(),
            MAX_INPUT_BYTES
        )));
    }
    if last.content.trim().is_empty() {
        return Err(ProxyError::invalid("input must not be empty"));
    }
    Ok(&last.content)
}

fn plain_chunks(
    mut events: MessageEventStream,
    request_id: Uuid,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    stream! {
        let mut collector = TextCollector::new();
        while let Some(event) = events.next().await {
            collector.process_event(&event);
            match event {
                MessageEvent::Start => {}
                MessageEvent::TextDelta { delta } => {
                    yield Ok::<Bytes, io::Error>(Bytes::from(delta));
                }
                MessageEvent::Done { .. } => {
                    log_completion(request_id, &collector);
                    return;
                }
                MessageEvent::Error { message } => {
                    warn!(%request_id, error = %message, "upstream failed mid-stream; aborting body");
                    yield Err(io::Error::other(message));
                    return;
                }
            }
        }
        warn!(%request_id, "upstream stream ended without completion; aborting body");
        yield Err(io::Error::other("upstream stream ended before completion"));
    }
}

fn sse_events(
    mut events: MessageEventStream,
    request_id: Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream! {
        let mut collector = TextCollector::new();
        while let Some(event) = events.next().await {
            collector.process_event(&event);
            match event {
                MessageEvent::Start => {}
                MessageEvent::TextDelta { delta } => {
                    yield Ok::<Event, Infallible>(
                        Event::default()
                            .event("delta")
                            .data(json!({ "text": delta }).to_string()),
                    );
                }
                MessageEvent::Done { stop_reason, .. } => {
                    log_completion(request_id, &collector);
                    yield Ok(
                        Event::default()
                            .event("done")
                            .data(json!({ "finish_reason": stop_reason.as_str() }).to_string()),
                    );
                    return;
                }
                MessageEvent::Error { message } => {
                    warn!(%request_id, error = %message, "upstream failed mid-stream");
                    yield Ok(error_event(&message));
                    return;
                }
            }
        }
        warn!(%request_id, "upstream stream ended without completion");
        yield Ok(error_event("upstream stream ended before completion"));
    }
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "message": message }).to_string())
}

fn log_completion(request_id: Uuid, collector: &TextCollector) {
    let stop_reason = match collector.outcome() {
        Outcome::Done { stop_reason, .. } => stop_reason.as_str(),
        _ => "none",
    };
    info!(
        %request_id,
        stop_reason,
        deltas = collector.deltas(),
        chars = collector.text().chars().count(),
        "completion finished"
    );
}
