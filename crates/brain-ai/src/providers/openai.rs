//! OpenAI-compatible Chat Completions provider

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::CompletionProvider;
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{Context, Message, Model, StopReason, StreamOptions, Usage},
};

/// Client for any endpoint speaking the OpenAI `/chat/completions` protocol
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAIProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    /// Create from an optional key, as resolved by [`super::provider_api_key`].
    /// Without a key no Authorization header is sent.
    pub fn with_optional_key(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    fn build_request(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> OpenAIRequest {
        OpenAIRequest {
            model: model.id.clone(),
            messages: context.messages.clone(),
            stream: true,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }

    fn build_headers(&self, model: &Model) -> Result<reqwest::header::HeaderMap> {
        use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| Error::InvalidApiKey)?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (key.parse::<HeaderName>(), value.parse::<HeaderValue>())
            {
                headers.insert(name, val);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream> {
        if model.base_url.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "no base URL configured for model {}",
                model.id
            )));
        }

        let request = self.build_request(model, context, options);
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        let headers = self.build_headers(model)?;

        tracing::debug!(
            model = %model.id,
            messages = request.messages.len(),
            "opening upstream completion stream"
        );

        let request_builder = self.client.post(&url).headers(headers).json(&request);
        let mut event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        // The first item settles whether the upstream accepted the request.
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
                    "upstream closed before responding".to_string(),
                ));
            }
        }

        Ok(Box::pin(create_stream(event_source)))
    }
}

/// Convert an event-source failure seen before the stream opened
async fn open_error(error: reqwest_eventsource::Error) -> Error {
    use reqwest_eventsource::Error as EsError;

    match error {
        EsError::InvalidStatusCode(status, response) => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            status_error(status.as_u16(), retry_after, &body)
        }
        EsError::InvalidContentType(content_type, response) => {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            if status >= 400 {
                status_error(status, None, &body)
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

/// Map an upstream non-success status and body to a typed error
pub(crate) fn status_error(status: u16, retry_after: Option<u64>, body: &str) -> Error {
    let api = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = api
        .as_ref()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        401 | 403 => Error::Auth(message),
        429 => match api {
            // Quota exhaustion is reported with a 429 but is not transient.
            Some(api) if api.error_type.as_deref() == Some("insufficient_quota") => {
                Error::api("insufficient_quota", api.message)
            }
            _ => Error::RateLimited { retry_after },
        },
        _ => match api {
            Some(api) => Error::api(
                api.error_type
                    .or(api.code)
                    .unwrap_or_else(|| format!("http_{}", status)),
                api.message,
            ),
            None => Error::Status { status, message },
        },
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield MessageEvent::Start;

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.trim() == "[DONE]" {
                        event_source.close();
                        yield MessageEvent::Done {
                            stop_reason: finish_reason
                                .as_deref()
                                .map(StopReason::from_finish_reason)
                                .unwrap_or(StopReason::Stop),
                            usage,
                        };
                        return;
                    }

                    match serde_json::from_str::<StreamChunk>(&msg.data) {
                        Ok(chunk) => {
                            if let Some(err) = chunk.error {
                                event_source.close();
                                yield MessageEvent::Error { message: err.message };
                                return;
                            }

                            for choice in chunk.choices {
                                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                                    yield MessageEvent::TextDelta { delta: content };
                                }
                                if let Some(reason) = choice.finish_reason {
                                    finish_reason = Some(reason);
                                }
                            }

                            if let Some(stream_usage) = chunk.usage {
                                usage.input = stream_usage.prompt_tokens;
                                usage.output = stream_usage.completion_tokens;
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            yield MessageEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    event_source.close();
                    yield MessageEvent::Error {
                        message: "upstream closed the stream before completion".to_string(),
                    };
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    return;
                }
            }
        }

        yield MessageEvent::Error {
            message: "upstream closed the stream before completion".to_string(),
        };
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<StreamUsage>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
