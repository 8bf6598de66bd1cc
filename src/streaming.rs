//! Streaming response handling using eventsource-stream
//!
//! The response body is read incrementally and parsed into SSE frames by
//! the eventsource-stream infrastructure. Frame handling is split in two:
//! the accumulators in this module are pure (one parsed event in, one
//! [`StreamUpdate`] out) and the [`drive_stream`] loop owns the effects,
//! invoking the per-chunk callback and checking for cancellation between
//! frames.

use std::collections::HashMap;
use std::pin::Pin;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::{ErrorDetail, LlmError};
use crate::types::{Completion, ContentBlock, MessageResponse, StreamingFunc};
use crate::utils::cancel::{CancelHandle, make_cancellable_stream};

/// One parsed SSE data payload
///
/// A single flexible shape covers every event type the API emits; fields
/// are populated per event type and default otherwise.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    message: Option<MessageResponse>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    content_block: Option<serde_json::Value>,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    usage: Option<UsageDelta>,
    #[serde(default)]
    completion: Option<String>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

/// Delta carried by `content_block_delta` and `message_delta` events
#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    stop_sequence: Option<String>,
}

/// Usage carried by `message_delta` events
#[derive(Debug, Deserialize)]
struct UsageDelta {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

/// Outcome of applying one event to an accumulator
#[derive(Debug, PartialEq, Eq)]
enum StreamUpdate {
    /// New content to deliver to the per-chunk callback
    Content(String),
    /// Event consumed (or ignored) with nothing to deliver
    Ignored,
    /// Terminal event; the stream is complete
    Done,
}

/// Pure state machine fed one parsed event at a time
trait EventAccumulator {
    fn apply_event(&mut self, event: StreamEvent) -> Result<StreamUpdate, LlmError>;
}

/// Assembles a [`MessageResponse`] from messages-endpoint events
///
/// `message_start` seeds the response, `content_block_start` opens blocks,
/// `content_block_delta` appends text (delivered to the callback) or
/// buffers partial tool-input JSON, `content_block_stop` parses the
/// buffered input, and `message_delta` patches the stop reason and usage.
#[derive(Debug, Default)]
struct MessageAccumulator {
    response: MessageResponse,
    tool_input_buffers: HashMap<usize, String>,
}

impl MessageAccumulator {
    fn into_response(self) -> MessageResponse {
        self.response
    }

    fn append_text(&mut self, index: Option<usize>, text: &str) {
        let index = index.unwrap_or_else(|| self.response.content.len().saturating_sub(1));
        match self.response.content.get_mut(index) {
            Some(ContentBlock::Text { text: existing }) => existing.push_str(text),
            _ => self.response.content.push(ContentBlock::Text {
                text: text.to_string(),
            }),
        }
    }
}

impl EventAccumulator for MessageAccumulator {
    fn apply_event(&mut self, event: StreamEvent) -> Result<StreamUpdate, LlmError> {
        match event.r#type.as_str() {
            "message_start" => {
                if let Some(message) = event.message {
                    self.response = message;
                }
                Ok(StreamUpdate::Ignored)
            }
            "content_block_start" => {
                if let Some(raw_block) = event.content_block {
                    let index = event.index.unwrap_or(self.response.content.len());
                    if index >= self.response.content.len() {
                        match serde_json::from_value::<ContentBlock>(raw_block) {
                            Ok(block) => self.response.content.push(block),
                            Err(e) => {
                                tracing::debug!("Ignoring unsupported content block: {e}");
                            }
                        }
                    }
                }
                Ok(StreamUpdate::Ignored)
            }
            "content_block_delta" => {
                let Some(delta) = event.delta else {
                    return Ok(StreamUpdate::Ignored);
                };
                match delta.delta_type.as_deref() {
                    Some("text_delta") => {
                        let Some(text) = delta.text else {
                            return Ok(StreamUpdate::Ignored);
                        };
                        self.append_text(event.index, &text);
                        Ok(StreamUpdate::Content(text))
                    }
                    Some("input_json_delta") => {
                        if let Some(partial) = delta.partial_json {
                            let index = event
                                .index
                                .unwrap_or_else(|| self.response.content.len().saturating_sub(1));
                            self.tool_input_buffers
                                .entry(index)
                                .or_default()
                                .push_str(&partial);
                        }
                        Ok(StreamUpdate::Ignored)
                    }
                    _ => Ok(StreamUpdate::Ignored),
                }
            }
            "content_block_stop" => {
                let index = event
                    .index
                    .unwrap_or_else(|| self.response.content.len().saturating_sub(1));
                if let Some(buffer) = self.tool_input_buffers.remove(&index)
                    && !buffer.is_empty()
                {
                    let parsed: serde_json::Value = serde_json::from_str(&buffer).map_err(|e| {
                        LlmError::ParseError(format!("Failed to parse tool input JSON: {e}"))
                    })?;
                    if let Some(ContentBlock::ToolUse { input, .. }) =
                        self.response.content.get_mut(index)
                    {
                        *input = parsed;
                    }
                }
                Ok(StreamUpdate::Ignored)
            }
            "message_delta" => {
                if let Some(delta) = event.delta {
                    if delta.stop_reason.is_some() {
                        self.response.stop_reason = delta.stop_reason;
                    }
                    if delta.stop_sequence.is_some() {
                        self.response.stop_sequence = delta.stop_sequence;
                    }
                }
                if let Some(usage) = event.usage {
                    if let Some(input_tokens) = usage.input_tokens {
                        self.response.usage.input_tokens = input_tokens;
                    }
                    if let Some(output_tokens) = usage.output_tokens {
                        self.response.usage.output_tokens = output_tokens;
                    }
                }
                Ok(StreamUpdate::Ignored)
            }
            "message_stop" => Ok(StreamUpdate::Done),
            "ping" => Ok(StreamUpdate::Ignored),
            "error" => Err(stream_error(event.error)),
            other => {
                tracing::debug!("Ignoring unknown stream event type: {other}");
                Ok(StreamUpdate::Ignored)
            }
        }
    }
}

/// Assembles a legacy [`Completion`] from `completion` events
///
/// Chunks are incremental; each frame's `completion` text is appended and
/// delivered to the callback as-is.
#[derive(Debug, Default)]
struct CompletionAccumulator {
    text: String,
}

impl CompletionAccumulator {
    fn into_completion(self) -> Completion {
        Completion { text: self.text }
    }
}

impl EventAccumulator for CompletionAccumulator {
    fn apply_event(&mut self, event: StreamEvent) -> Result<StreamUpdate, LlmError> {
        match event.r#type.as_str() {
            "ping" => Ok(StreamUpdate::Ignored),
            "error" => Err(stream_error(event.error)),
            other => {
                // Legacy frames may omit the type tag; any frame carrying a
                // completion field counts as a chunk.
                if let Some(chunk) = event.completion {
                    self.text.push_str(&chunk);
                    Ok(StreamUpdate::Content(chunk))
                } else {
                    if !other.is_empty() {
                        tracing::debug!("Ignoring unknown stream event type: {other}");
                    }
                    Ok(StreamUpdate::Ignored)
                }
            }
        }
    }
}

fn stream_error(detail: Option<ErrorDetail>) -> LlmError {
    let detail = detail.unwrap_or_default();
    let message = if detail.error_type.is_empty() {
        detail.message
    } else {
        format!("{}: {}", detail.error_type, detail.message)
    };
    LlmError::StreamError(message)
}

/// Read SSE frames from `response` and feed them to `accumulator`.
///
/// Content updates go to the callback synchronously, in frame order; a
/// callback error stops the read and propagates unchanged. With a cancel
/// handle attached the frame stream stops at the next poll after
/// cancellation and the call returns [`LlmError::Cancelled`], unless the
/// terminal event had already been seen.
async fn drive_stream<A: EventAccumulator>(
    response: reqwest::Response,
    accumulator: &mut A,
    streaming_func: &StreamingFunc,
    cancel_handle: Option<CancelHandle>,
) -> Result<(), LlmError> {
    let event_stream = Box::pin(response.bytes_stream().eventsource());
    let mut frames: Pin<
        Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>,
    > = match cancel_handle.clone() {
        Some(handle) => Box::pin(make_cancellable_stream(event_stream, handle)),
        None => event_stream,
    };

    let mut done = false;

    while let Some(frame) = frames.next().await {
        let event = frame.map_err(|e| LlmError::StreamError(format!("SSE parsing error: {e}")))?;

        tracing::debug!("Anthropic SSE event: {}", event.data);

        if event.data.trim() == "[DONE]" {
            break;
        }
        if event.data.trim().is_empty() {
            continue;
        }

        let parsed: StreamEvent = serde_json::from_str(&event.data)
            .map_err(|e| LlmError::ParseError(format!("Failed to parse stream event: {e}")))?;

        match accumulator.apply_event(parsed)? {
            StreamUpdate::Content(chunk) => streaming_func(chunk.as_bytes())?,
            StreamUpdate::Ignored => {}
            StreamUpdate::Done => {
                done = true;
                break;
            }
        }
    }

    if !done && cancel_handle.is_some_and(|handle| handle.is_cancelled()) {
        return Err(LlmError::Cancelled);
    }

    Ok(())
}

/// Consume a streamed messages response into the assembled [`MessageResponse`].
pub(crate) async fn run_message_stream(
    response: reqwest::Response,
    streaming_func: StreamingFunc,
    cancel_handle: Option<CancelHandle>,
) -> Result<MessageResponse, LlmError> {
    let mut accumulator = MessageAccumulator::default();
    drive_stream(response, &mut accumulator, &streaming_func, cancel_handle).await?;
    Ok(accumulator.into_response())
}

/// Consume a streamed legacy completion response into a [`Completion`].
pub(crate) async fn run_completion_stream(
    response: reqwest::Response,
    streaming_func: StreamingFunc,
    cancel_handle: Option<CancelHandle>,
) -> Result<Completion, LlmError> {
    let mut accumulator = CompletionAccumulator::default();
    drive_stream(response, &mut accumulator, &streaming_func, cancel_handle).await?;
    Ok(accumulator.into_completion())
}
