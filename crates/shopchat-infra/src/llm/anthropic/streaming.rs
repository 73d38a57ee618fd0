//! SSE stream creation and state machine for the Anthropic Messages API.
//!
//! Event order on the wire:
//! 1. `message_start` -- Message object with initial usage
//! 2. Per block: `content_block_start` -> N x `content_block_delta` -> `content_block_stop`
//! 3. `message_delta` -- stop_reason and cumulative usage
//! 4. `message_stop` -- final event
//! 5. `ping` events may appear anywhere (keepalive)
//! 6. `error` events may appear mid-stream
//!
//! Block boundaries carry nothing a text stream needs and are skipped.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use reqwest_eventsource::{Error as EventSourceError, Event, RequestBuilderExt};
use secrecy::{ExposeSecret, SecretString};

use shopchat_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::client::{error_for_status, API_VERSION};
use super::types::{
    parse_stop_reason, AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload,
    MessageDeltaPayload, MessageStartPayload,
};

/// Boxed stream of decoded provider events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// State carried across the events of one streamed message.
#[derive(Default)]
pub struct StreamState {
    message_id: Option<String>,
}

impl StreamState {
    /// Provider message id, once `message_start` has been seen.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

/// Process one SSE event into zero or more [`StreamEvent`]s.
///
/// An `error` event, or a payload that fails to decode, ends the stream
/// with the corresponding [`LlmError`].
pub fn process_event(
    event_type: &str,
    json_data: &str,
    state: &mut StreamState,
) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "message_start" => {
            let payload: MessageStartPayload = serde_json::from_str(json_data)
                .map_err(|e| LlmError::Deserialization(format!("message_start: {e}")))?;
            state.message_id = Some(payload.message.id);
            tracing::debug!(model = %payload.message.model, "Anthropic stream started");
            if let Some(usage) = payload.message.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_str(json_data)
                .map_err(|e| LlmError::Deserialization(format!("content_block_delta: {e}")))?;
            if let AnthropicDelta::TextDelta { text } = payload.delta {
                events.push(StreamEvent::TextDelta { text });
            }
        }

        "message_delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(json_data)
                .map_err(|e| LlmError::Deserialization(format!("message_delta: {e}")))?;
            events.push(StreamEvent::Usage(Usage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            }));
            events.push(StreamEvent::MessageDelta {
                stop_reason: parse_stop_reason(payload.delta.stop_reason.as_deref()),
            });
        }

        "message_stop" => {
            events.push(StreamEvent::Done);
        }

        "content_block_start" | "content_block_stop" | "ping" => {}

        "error" => {
            let payload: ErrorPayload = serde_json::from_str(json_data)
                .map_err(|e| LlmError::Deserialization(format!("error event: {e}")))?;
            return Err(error_for_type(&payload.error.error_type, payload.error.message));
        }

        unknown => {
            tracing::warn!(event_type = unknown, "unknown Anthropic event type, skipping");
        }
    }

    Ok(events)
}

/// Map an Anthropic error `type` to an [`LlmError`].
pub(crate) fn error_for_type(error_type: &str, message: String) -> LlmError {
    match error_type {
        "overloaded_error" => LlmError::Overloaded(message),
        "rate_limit_error" => LlmError::RateLimited {
            retry_after_ms: None,
        },
        "authentication_error" => LlmError::AuthenticationFailed,
        "invalid_request_error" => LlmError::InvalidRequest(message),
        _ => LlmError::Provider { message },
    }
}

/// Open a streaming SSE connection to the Messages API.
///
/// The connection is never retried: any transport error, non-2xx status
/// or `error` event ends the stream with an error item. The stream ends
/// cleanly after `message_stop`.
pub fn create_event_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> EventStream {
    let request = client
        .post(url)
        .header("x-api-key", api_key.expose_secret())
        .header("anthropic-version", API_VERSION)
        .header("content-type", "application/json")
        .json(&body);

    Box::pin(async_stream::try_stream! {
        let mut source = request
            .eventsource()
            .map_err(|e| LlmError::Stream(format!("cannot open event stream: {e}")))?;
        let mut state = StreamState::default();

        while let Some(next) = source.next().await {
            match next {
                Ok(Event::Open) => tracing::debug!("Anthropic stream connected"),
                Ok(Event::Message(message)) => {
                    let processed = process_event(&message.event, &message.data, &mut state);
                    if processed.is_err() {
                        source.close();
                    }
                    let events = processed?;
                    let done = events.iter().any(|e| matches!(e, StreamEvent::Done));
                    for event in events {
                        yield event;
                    }
                    if done {
                        source.close();
                        break;
                    }
                }
                Err(EventSourceError::StreamEnded) => break,
                Err(e) => {
                    source.close();
                    Err::<(), LlmError>(map_source_error(e).await)?;
                }
            }
        }

        tracing::debug!(message_id = ?state.message_id(), "Anthropic stream closed");
    })
}

/// Usage and stop reason gathered while a stream is read.
#[derive(Debug, Default)]
pub struct StreamSummary {
    pub usage: Usage,
    pub stop_reason: Option<StopReason>,
}

impl StreamSummary {
    /// Fold one event into the summary, returning its text if it has any.
    pub fn observe(&mut self, event: StreamEvent) -> Option<String> {
        match event {
            StreamEvent::TextDelta { text } => return Some(text),
            StreamEvent::Usage(usage) => {
                if usage.input_tokens > 0 {
                    self.usage.input_tokens = usage.input_tokens;
                }
                // output_tokens is cumulative across message_start and message_delta
                self.usage.output_tokens = self.usage.output_tokens.max(usage.output_tokens);
            }
            StreamEvent::MessageDelta { stop_reason } => self.stop_reason = Some(stop_reason),
            StreamEvent::Done => {}
        }
        None
    }

    /// Record the summary on the current span.
    pub fn record(&self) {
        let span = tracing::Span::current();
        span.record("gen_ai.usage.input_tokens", self.usage.input_tokens);
        span.record("gen_ai.usage.output_tokens", self.usage.output_tokens);
        if let Some(reason) = self.stop_reason {
            span.record("gen_ai.response.finish_reasons", tracing::field::display(reason));
        }
    }
}

/// Reduce decoded events to the answer text.
///
/// Usage and the stop reason are recorded on the current span once the
/// stream ends. An answer cut off by the output ceiling is logged.
pub fn text_fragments(
    mut events: EventStream,
) -> impl Stream<Item = Result<String, LlmError>> + Send + 'static {
    async_stream::try_stream! {
        let mut summary = StreamSummary::default();
        while let Some(event) = events.next().await {
            if let Some(text) = summary.observe(event?) {
                yield text;
            }
        }

        summary.record();
        if summary.stop_reason == Some(StopReason::MaxTokens) {
            tracing::warn!(
                output_tokens = summary.usage.output_tokens,
                "Answer truncated at max_tokens"
            );
        }
    }
}

async fn map_source_error(error: EventSourceError) -> LlmError {
    match error {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Anthropic stream API error response");
            error_for_status(status, body)
        }
        EventSourceError::Transport(e) => LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        },
        other => LlmError::Stream(other.to_string()),
    }
}

pin_project! {
    /// Stream wrapper that enters `span` on every poll, so events logged
    /// while the body is decoded stay attached to the request span.
    pub struct InstrumentedStream<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S> InstrumentedStream<S> {
    pub fn new(inner: S, span: tracing::Span) -> Self {
        Self { inner, span }
    }
}

impl<S: Stream> Stream for InstrumentedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _entered = this.span.enter();
        this.inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
