//! Transport abstraction for reaching the completion proxy

use async_stream::stream;
use async_trait::async_trait;
use brain_ai::{Error, Message, MessageEvent, MessageEventStream, Result, StopReason, Usage};
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Transport for streaming a reply to a conversation
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a streaming request for `messages`.
    ///
    /// Resolves once the reply has started; a rejection before that is an
    /// `Err`. The returned stream ends with exactly one terminal event.
    async fn open(
        &self,
        messages: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<MessageEventStream>;
}

/// How the proxy frames its streaming response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// Server-sent events with explicit `done` / `error` events
    #[default]
    EventStream,
    /// Raw chunked text; a clean end of body means success
    PlainText,
}

/// HTTP transport that talks to a brain-proxy `POST /api/chat` endpoint
pub struct ProxyTransport {
    client: reqwest::Client,
    url: String,
    framing: Framing,
}

impl ProxyTransport {
    /// Create a transport for the given chat endpoint URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            framing: Framing::default(),
        }
    }

    /// Set the response framing
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open_event_stream(&self, body: &ChatBody) -> Result<MessageEventStream> {
        let request = self.client.post(&self.url).json(body);
        let mut event_source = EventSource::new(request)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        match event_source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(_))) => {
                event_source.close();
                return Err(Error::UnexpectedResponse(
                    "message received before connection opened".to_string(),
                ));
            }
            Some(Err(e)) => {
                event_source.close();
                return Err(open_error(e).await);
            }
            None => {
                return Err(Error::UnexpectedResponse(
                    "proxy closed before responding".to_string(),
                ));
            }
        }

        Ok(Box::pin(sse_stream(event_source)))
    }

    async fn open_plain_stream(&self, body: &ChatBody) -> Result<MessageEventStream> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &text));
        }

        Ok(Box::pin(plain_stream(response)))
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn open(
        &self,
        messages: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<MessageEventStream> {
        let body = ChatBody { messages };
        tracing::debug!(url = %self.url, messages = body.messages.len(), framing = ?self.framing, "opening chat stream");

        let open = async {
            match self.framing {
                Framing::EventStream => self.open_event_stream(&body).await,
                Framing::PlainText => self.open_plain_stream(&body).await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Aborted),
            result = open => result,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatBody {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct DeltaData {
    text: String,
}

#[derive(Debug, Deserialize)]
struct DoneData {
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    message: String,
}

/// Map a proxy rejection to a typed error, keeping the proxy's message
fn status_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    Error::Status { status, message }
}

async fn open_error(error: reqwest_eventsource::Error) -> Error {
    use reqwest_eventsource::Error as EsError;

    match error {
        EsError::InvalidStatusCode(status, response) => {
            let text = response.text().await.unwrap_or_default();
            status_error(status.as_u16(), &text)
        }
        EsError::InvalidContentType(content_type, response) => {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            if status >= 400 {
                status_error(status, &text)
            } else {
                Error::UnexpectedResponse(format!(
                    "expected text/event-stream, got {:?}",
                    content_type
                ))
            }
        }
        EsError::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn sse_stream(mut event_source: EventSource) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        yield MessageEvent::Start;

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => match msg.event.as_str() {
                    "delta" => match serde_json::from_str::<DeltaData>(&msg.data) {
                        Ok(data) => {
                            yield MessageEvent::TextDelta { delta: data.text };
                        }
                        Err(e) => {
                            event_source.close();
                            yield MessageEvent::error(format!("malformed delta event: {}", e));
                            return;
                        }
                    },
                    "done" => {
                        event_source.close();
                        let finish_reason = serde_json::from_str::<DoneData>(&msg.data)
                            .ok()
                            .and_then(|d| d.finish_reason);
                        yield MessageEvent::Done {
                            stop_reason: finish_reason
                                .as_deref()
                                .map(StopReason::from_finish_reason)
                                .unwrap_or(StopReason::Stop),
                            usage: Usage::default(),
                        };
                        return;
                    }
                    "error" => {
                        event_source.close();
                        let message = serde_json::from_str::<ErrorData>(&msg.data)
                            .map(|d| d.message)
                            .unwrap_or(msg.data);
                        yield MessageEvent::Error { message };
                        return;
                    }
                    other => {
                        tracing::debug!(event = other, "ignoring unknown proxy event");
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    event_source.close();
                    yield MessageEvent::error("connection closed before the reply completed");
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield MessageEvent::error(format!("SSE error: {}", e));
                    return;
                }
            }
        }

        yield MessageEvent::error("connection closed before the reply completed");
    }
}

fn plain_stream(response: reqwest::Response) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        yield MessageEvent::Start;

        let mut decoder = Utf8Decoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    let text = decoder.push(&bytes);
                    if !text.is_empty() {
                        yield MessageEvent::TextDelta { delta: text };
                    }
                }
                Err(e) => {
                    yield MessageEvent::error(format!("response body error: {}", e));
                    return;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield MessageEvent::TextDelta { delta: tail };
        }
        yield MessageEvent::done();
    }
}

/// Incremental UTF-8 decoder.
///
/// Bytes of a character split across chunks are held back until the rest
/// arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any held-back prefix) as possible
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush held-back bytes at end of input
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_split_multibyte() {
        let text = "gravité 🌌";
        let bytes = text.as_bytes();
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.push(std::slice::from_ref(b)));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, text);
    }

    #[test]
    fn test_decoder_holds_back_partial_char() {
        let mut decoder = Utf8Decoder::new();
        // "é" is 0xC3 0xA9
        assert_eq!(decoder.push(b"caf\xC3"), "caf");
        assert_eq!(decoder.push(b"\xA9!"), "é!");
    }

    #[test]
    fn test_decoder_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decoder.push(b"\xE2\x82"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_status_error_uses_proxy_message() {
        let err = status_error(400, r#"{"error":"messages must not be empty"}"#);
        assert!(matches!(
            err,
            Error::Status { status: 400, ref message } if message == "messages must not be empty"
        ));

        let err = status_error(429, "slow down");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_framing_default_and_serde() {
        assert_eq!(Framing::default(), Framing::EventStream);
        let parsed: Framing = serde_json::from_str("\"plain-text\"").unwrap();
        assert_eq!(parsed, Framing::PlainText);
    }
}
