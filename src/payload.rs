//! Wire payload construction
//!
//! Translates the public request types into the provider's JSON shapes.
//! The legacy completion shape and the messages shape are separate structs,
//! so a legacy request can never emit `messages`, `tools`, or `top_k`.
//!
//! `temperature` is always serialized, including `0.0`; every other sampling
//! control is omitted when unset.

use serde::Serialize;

use crate::error::LlmError;
use crate::types::{ChatMessage, CompletionRequest, MessageRequest, Tool, ToolChoice};

/// Wire shape for the legacy text completions endpoint
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletionPayload {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_to_sample: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Wire shape for the messages endpoint
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MessagePayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoicePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// A tool as the API expects it: a flat {name, description, input_schema}
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolPayload {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Tool choice as a type tag, with a name only for the forced-tool case
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolChoicePayload {
    #[serde(rename = "type")]
    pub choice_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub(crate) fn build_completion_payload(
    request: &CompletionRequest,
    model: String,
) -> CompletionPayload {
    CompletionPayload {
        model,
        prompt: request.prompt.clone(),
        temperature: request.temperature,
        max_tokens_to_sample: request.max_tokens,
        stop_sequences: request.stop_sequences.clone(),
        top_p: request.top_p,
        stream: request.stream.then_some(true),
    }
}

pub(crate) fn build_message_payload(
    request: &MessageRequest,
    model: String,
) -> Result<MessagePayload, LlmError> {
    let tool_choice = request
        .tool_choice
        .as_ref()
        .map(|choice| convert_tool_choice(choice, &request.tools))
        .transpose()?;
    let tools = convert_tools(&request.tools)?;

    Ok(MessagePayload {
        model,
        messages: request.messages.clone(),
        system: request.system.clone(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stop_sequences: request.stop_sequences.clone(),
        top_p: request.top_p,
        top_k: request.top_k,
        tools,
        tool_choice,
        stream: request.stream.then_some(true),
    })
}

/// Translate the tool list, rejecting any entry without a function definition.
fn convert_tools(tools: &[Tool]) -> Result<Option<Vec<ToolPayload>>, LlmError> {
    if tools.is_empty() {
        return Ok(None);
    }

    let mut result = Vec::with_capacity(tools.len());
    for tool in tools {
        let function = tool.function.as_ref().ok_or_else(|| {
            LlmError::InvalidInput("invalid tool: missing function definition".to_string())
        })?;
        result.push(ToolPayload {
            name: function.name.clone(),
            description: function.description.clone(),
            input_schema: function.parameters.clone(),
        });
    }
    Ok(Some(result))
}

/// Translate the tool choice policy. A forced tool must name a tool from the
/// request's tool list that carries a function definition.
fn convert_tool_choice(choice: &ToolChoice, tools: &[Tool]) -> Result<ToolChoicePayload, LlmError> {
    match choice {
        ToolChoice::Auto => Ok(ToolChoicePayload {
            choice_type: "auto".to_string(),
            name: None,
        }),
        ToolChoice::None => Ok(ToolChoicePayload {
            choice_type: "none".to_string(),
            name: None,
        }),
        ToolChoice::Tool { name } => {
            let known = tools.iter().any(|tool| {
                tool.function
                    .as_ref()
                    .is_some_and(|function| function.name == *name)
            });
            if !known {
                return Err(LlmError::InvalidInput(format!(
                    "invalid tool choice: no tool named '{name}' with a function definition"
                )));
            }
            Ok(ToolChoicePayload {
                choice_type: "tool".to_string(),
                name: Some(name.clone()),
            })
        }
    }
}
