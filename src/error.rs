//! Error types for the client
//!
//! All failures surface as a single [`LlmError`] value returned to the
//! caller. Nothing is logged, retried, or swallowed internally; structured
//! API errors keep the status code, the provider's error type and message,
//! and the raw response body so callers can branch or diagnose without
//! re-deriving anything from logs.

use serde::Deserialize;

/// Unified error type for all client operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP transport error (connection, request construction, body read)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The API returned a non-2xx status code.
    ///
    /// `message` is the composed diagnostic
    /// (`API returned unexpected status code: <code>: <provider message>`);
    /// `error_type` and `error_message` are the provider's own envelope
    /// fields when the body parsed, and `raw_response` is the body text as
    /// received.
    #[error("{message}")]
    ApiError {
        /// HTTP status code of the failed response
        status: u16,
        /// Provider-supplied error type, e.g. `rate_limit_error`
        error_type: Option<String>,
        /// Composed human-readable message
        message: String,
        /// Provider-supplied error message, unmodified
        error_message: Option<String>,
        /// Raw response body for forensic inspection
        raw_response: Option<String>,
    },

    /// Input failed validation before any request was issued
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client-side configuration problem (bad header value, incomplete
    /// delegated-mode settings, ...)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No API key was provided and none could be found in the environment
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// The API answered 2xx with an empty body
    #[error("empty response")]
    EmptyResponse,

    /// A response body could not be decoded
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The event stream failed (malformed SSE frame or a provider `error`
    /// event)
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Cancellation was requested while reading the response stream
    #[error("request cancelled")]
    Cancelled,
}

impl LlmError {
    /// HTTP status code for API errors, `None` for everything else.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::HttpError(_) => true,
            _ => false,
        }
    }
}

/// Anthropic error envelope: `{"error": {"message": "...", "type": "..."}}`
///
/// Fields default so that bodies with a partial envelope still decode.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: String,
}

/// Build the structured [`LlmError::ApiError`] for a non-2xx response.
///
/// When the body is not valid JSON the result is still the structured
/// variant with the status populated and the raw body retained; only the
/// provider fields stay empty.
pub(crate) fn decode_api_error(status: u16, body: String) -> LlmError {
    let message = format!("API returned unexpected status code: {status}");

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => {
            let composed = if envelope.error.message.is_empty() {
                message
            } else {
                format!("{message}: {}", envelope.error.message)
            };
            LlmError::ApiError {
                status,
                error_type: (!envelope.error.error_type.is_empty())
                    .then_some(envelope.error.error_type),
                message: composed,
                error_message: (!envelope.error.message.is_empty())
                    .then_some(envelope.error.message),
                raw_response: Some(body),
            }
        }
        Err(_) => LlmError::ApiError {
            status,
            error_type: None,
            message,
            error_message: None,
            raw_response: Some(body),
        },
    }
}
