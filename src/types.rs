//! Request and response types for the Anthropic API
//!
//! Two request shapes exist: the legacy single-prompt [`CompletionRequest`]
//! and the chat-style [`MessageRequest`]. They are deliberately separate
//! types so one shape can never leak fields into the other (the legacy shape
//! carries no tools, messages, or `top_k`).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::utils::cancel::CancelHandle;

/// Callback invoked synchronously for each streamed content chunk.
///
/// Receives the incremental bytes of every content delta, in frame order.
/// Return an error to stop streaming early; the error is returned to the
/// caller unchanged as the call's result.
pub type StreamingFunc = Arc<dyn Fn(&[u8]) -> Result<(), LlmError> + Send + Sync>;

/// Message role in a chat-style request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content
///
/// `ToolUse` appears in responses when the model requests a tool invocation;
/// `ToolResult` is sent back by the caller with the tool's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// A role-tagged turn in a chat-style request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// A user turn with plain text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// An assistant turn with plain text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// A user turn carrying the result of a previous tool invocation.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
            }],
        }
    }
}

/// A callable tool offered to the model
///
/// `function` may be absent on a value under construction; the request
/// builder rejects tools without one before anything is sent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tool {
    /// Tool kind, normally `"function"`
    pub tool_type: String,
    /// The function definition; required for the request to be valid
    pub function: Option<ToolFunction>,
}

impl Tool {
    /// A function tool with the given name, description and parameter schema.
    ///
    /// The schema is passed through to the API opaquely, never validated.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: Some(ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            }),
        }
    }
}

/// The function definition behind a [`Tool`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    /// Opaque JSON Schema document for the tool's input
    pub parameters: serde_json::Value,
}

/// Policy constraining whether/which tool the model may select
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides freely (the default)
    #[default]
    Auto,
    /// The model must not invoke any tool
    None,
    /// The model must invoke the named tool
    Tool { name: String },
}

impl ToolChoice {
    /// Force the model to use a specific tool.
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }

    /// The forced tool name, if this policy names one.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::Tool { name } => Some(name),
            _ => None,
        }
    }
}

/// Request for the legacy text completions API
#[derive(Clone, Default)]
pub struct CompletionRequest {
    /// Model override; falls back to the client's configured model
    pub model: Option<String>,
    pub prompt: String,
    /// Always serialized, including `0.0`
    pub temperature: f64,
    /// Wire name `max_tokens_to_sample`
    pub max_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub top_p: Option<f64>,
    /// Request a streamed response; requires `streaming_func`
    pub stream: bool,
    /// Per-chunk delivery callback; consulted only when `stream` is set
    pub streaming_func: Option<StreamingFunc>,
    /// Checked between stream chunks; cancelling aborts the read
    pub cancel_handle: Option<CancelHandle>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    pub const fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Stream the response, delivering each chunk to `func`.
    pub fn with_streaming_func(mut self, func: StreamingFunc) -> Self {
        self.stream = true;
        self.streaming_func = Some(func);
        self
    }

    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel_handle = Some(handle);
        self
    }
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("stop_sequences", &self.stop_sequences)
            .field("top_p", &self.top_p)
            .field("stream", &self.stream)
            .field("streaming_func", &self.streaming_func.as_ref().map(|_| "<callback>"))
            .field("cancel_handle", &self.cancel_handle)
            .finish()
    }
}

/// Request for the messages API
#[derive(Clone, Default)]
pub struct MessageRequest {
    /// Model override; falls back to the client's configured model
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// System instruction, sent as the top-level `system` field
    pub system: Option<String>,
    /// Always serialized, including `0.0`
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub tools: Vec<Tool>,
    pub tool_choice: Option<ToolChoice>,
    /// Request a streamed response; requires `streaming_func`
    pub stream: bool,
    /// Per-chunk delivery callback; consulted only when `stream` is set
    pub streaming_func: Option<StreamingFunc>,
    /// Checked between stream chunks; cancelling aborts the read
    pub cancel_handle: Option<CancelHandle>,
}

impl MessageRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = stop_sequences;
        self
    }

    pub const fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub const fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    /// Stream the response, delivering each content delta to `func`.
    pub fn with_streaming_func(mut self, func: StreamingFunc) -> Self {
        self.stream = true;
        self.streaming_func = Some(func);
        self
    }

    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel_handle = Some(handle);
        self
    }
}

impl fmt::Debug for MessageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRequest")
            .field("model", &self.model)
            .field("messages", &self.messages)
            .field("system", &self.system)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("stop_sequences", &self.stop_sequences)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("tools", &self.tools)
            .field("tool_choice", &self.tool_choice)
            .field("stream", &self.stream)
            .field("streaming_func", &self.streaming_func.as_ref().map(|_| "<callback>"))
            .field("cancel_handle", &self.cancel_handle)
            .finish()
    }
}

/// Result of a legacy text completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// Token accounting reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Result of a messages API call
///
/// Mirrors the wire payload; streamed calls return the same type assembled
/// from the event frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: String,
    /// Payload kind, normally `"message"`
    #[serde(rename = "type", default)]
    pub response_type: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl MessageResponse {
    /// Concatenated text of all text content blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool invocations requested by the model, if any.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &serde_json::Value)> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::Text {
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hello"}));

        let tool_use: ContentBlock = serde_json::from_value(serde_json::json!({
            "type": "tool_use",
            "id": "toolu_01",
            "name": "getCurrentWeather",
            "input": {"location": "Boston"}
        }))
        .unwrap();
        match tool_use {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_01");
                assert_eq!(name, "getCurrentWeather");
                assert_eq!(input["location"], "Boston");
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn test_chat_message_helpers() {
        let msg = ChatMessage::user("hi");
        assert_eq!(msg.role, Role::User);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({
                "role": "user",
                "content": [{"type": "text", "text": "hi"}]
            })
        );

        let reply = ChatMessage::assistant("Hello! How can I help?");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({
                "role": "assistant",
                "content": [{"type": "text", "text": "Hello! How can I help?"}]
            })
        );

        let result = ChatMessage::tool_result("toolu_01", "72 degrees");
        assert_eq!(result.role, Role::User);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": "toolu_01",
                    "content": "72 degrees"
                }]
            })
        );
    }

    #[test]
    fn test_message_response_text() {
        let response = MessageResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Hello".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_01".to_string(),
                    name: "lookup".to_string(),
                    input: serde_json::json!({}),
                },
                ContentBlock::Text {
                    text: ", world".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(response.text(), "Hello, world");
        assert_eq!(response.tool_uses().count(), 1);
    }

    #[test]
    fn test_debug_hides_callback_body() {
        let request = MessageRequest::new(vec![ChatMessage::user("hi")])
            .with_streaming_func(Arc::new(|_| Ok(())));
        let rendered = format!("{request:?}");
        assert!(rendered.contains("<callback>"));
    }

    #[test]
    fn test_tool_choice_helpers() {
        assert_eq!(ToolChoice::default(), ToolChoice::Auto);
        let choice = ToolChoice::tool("getCurrentWeather");
        assert_eq!(choice.tool_name(), Some("getCurrentWeather"));
        assert_eq!(ToolChoice::Auto.tool_name(), None);
    }
}
