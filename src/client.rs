//! Anthropic API client
//!
//! One [`Client`] serves both request shapes (messages and legacy text
//! completions) and both addressing modes. Direct mode posts to
//! `{base_url}/messages` or `{base_url}/complete` with `x-api-key` auth;
//! delegated mode (a Vertex AI project id plus location) posts to the
//! Vertex raw-predict URL with Bearer auth, and the base URL and path are
//! not consulted. The mode is fixed at build time and the client is
//! read-only afterwards, so it can be shared freely across tasks.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{LlmError, decode_api_error};
use crate::payload::{build_completion_payload, build_message_payload};
use crate::streaming::{run_completion_stream, run_message_stream};
use crate::types::{
    Completion, CompletionRequest, ContentBlock, MessageRequest, MessageResponse,
};
use crate::utils::http_headers::ProviderHeaders;
use crate::utils::url::{join_url, vertex_predict_url};

/// Wire shape of a non-streaming legacy completion response
#[derive(Debug, Deserialize)]
struct CompletionResponseBody {
    #[serde(default)]
    completion: String,
}

/// Client for the Anthropic messages and text completions APIs
pub struct Client {
    /// API key (direct mode) or access token (delegated mode), securely stored
    api_key: SecretString,
    model: String,
    base_url: String,
    vertex_project_id: Option<String>,
    vertex_location: Option<String>,
    anthropic_version: Option<String>,
    use_legacy_text_completions: bool,
    http_client: reqwest::Client,
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            vertex_project_id: self.vertex_project_id.clone(),
            vertex_location: self.vertex_location.clone(),
            anthropic_version: self.anthropic_version.clone(),
            use_legacy_text_completions: self.use_legacy_text_completions,
            http_client: self.http_client.clone(),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("vertex_project_id", &self.vertex_project_id)
            .field("vertex_location", &self.vertex_location)
            .field("anthropic_version", &self.anthropic_version)
            .field(
                "use_legacy_text_completions",
                &self.use_legacy_text_completions,
            )
            .finish()
    }
}

impl Client {
    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single entry point over both shapes: routes to the legacy
    /// completions API when the client was built with
    /// `legacy_text_completions(true)`, else to the messages API.
    ///
    /// On the legacy path the first message must lead with a text block;
    /// its text is wrapped in the `\n\nHuman: ... \n\nAssistant:` prompt
    /// frame the completions API expects, and the result comes back as a
    /// single-text-block [`MessageResponse`].
    pub async fn generate(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        if !self.use_legacy_text_completions {
            return self.create_message(request).await;
        }

        let completion_request = CompletionRequest {
            model: request.model.clone(),
            prompt: legacy_prompt(request)?,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop_sequences: request.stop_sequences.clone(),
            top_p: request.top_p,
            stream: request.stream,
            streaming_func: request.streaming_func.clone(),
            cancel_handle: request.cancel_handle.clone(),
        };
        let completion = self.create_completion(&completion_request).await?;

        Ok(MessageResponse {
            response_type: "completion".to_string(),
            role: "assistant".to_string(),
            content: vec![ContentBlock::Text {
                text: completion.text,
            }],
            ..Default::default()
        })
    }

    /// Call the legacy text completions API.
    ///
    /// When streaming is requested ([`CompletionRequest::with_streaming_func`])
    /// the chunks are delivered as they arrive and the returned [`Completion`]
    /// holds the concatenated text.
    pub async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, LlmError> {
        if request.stream && request.streaming_func.is_none() {
            return Err(LlmError::InvalidInput(
                "streaming requested without a streaming_func".to_string(),
            ));
        }

        let model = request.model.as_deref().unwrap_or(&self.model).to_string();
        let payload = build_completion_payload(request, model.clone());
        let response = self.send_request("/complete", &model, &payload).await?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        if request.stream && let Some(streaming_func) = &request.streaming_func {
            return run_completion_stream(
                response,
                streaming_func.clone(),
                request.cancel_handle.clone(),
            )
            .await;
        }

        let body = read_body(response).await?;
        let parsed: CompletionResponseBody = serde_json::from_str(&body)
            .map_err(|e| LlmError::ParseError(format!("Failed to parse response: {e}")))?;
        Ok(Completion {
            text: parsed.completion,
        })
    }

    /// Call the messages API.
    ///
    /// When streaming is requested ([`MessageRequest::with_streaming_func`])
    /// every content delta is delivered as it arrives and the returned
    /// [`MessageResponse`] is assembled from the event frames.
    pub async fn create_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, LlmError> {
        if request.stream && request.streaming_func.is_none() {
            return Err(LlmError::InvalidInput(
                "streaming requested without a streaming_func".to_string(),
            ));
        }

        let model = request.model.as_deref().unwrap_or(&self.model).to_string();
        let payload = build_message_payload(request, model.clone())?;
        let response = self.send_request("/messages", &model, &payload).await?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        if request.stream && let Some(streaming_func) = &request.streaming_func {
            return run_message_stream(
                response,
                streaming_func.clone(),
                request.cancel_handle.clone(),
            )
            .await;
        }

        let body = read_body(response).await?;
        serde_json::from_str(&body)
            .map_err(|e| LlmError::ParseError(format!("Failed to parse response: {e}")))
    }

    /// Target URL for a call. Delegated mode builds the Vertex predict URL
    /// from project, location and the effective model; the configured base
    /// URL and the path are ignored in that mode.
    fn request_url(&self, path: &str, model: &str) -> String {
        match (&self.vertex_project_id, &self.vertex_location) {
            (Some(project), Some(location)) => vertex_predict_url(project, location, model),
            _ => join_url(&self.base_url, path),
        }
    }

    /// `anthropic-version` header value: explicit configuration wins, then
    /// the mode-specific default.
    fn resolved_version(&self) -> &str {
        match &self.anthropic_version {
            Some(version) => version,
            None if self.vertex_project_id.is_some() => defaults::api::VERTEX_ANTHROPIC_VERSION,
            None => defaults::api::ANTHROPIC_VERSION,
        }
    }

    fn request_headers(&self) -> Result<reqwest::header::HeaderMap, LlmError> {
        let version = self.resolved_version();
        if self.vertex_project_id.is_some() {
            ProviderHeaders::vertex_bearer(self.api_key.expose_secret(), version)
        } else {
            ProviderHeaders::anthropic(self.api_key.expose_secret(), version)
        }
    }

    async fn send_request<T: Serialize>(
        &self,
        path: &str,
        model: &str,
        payload: &T,
    ) -> Result<reqwest::Response, LlmError> {
        let url = self.request_url(path, model);
        let headers = self.request_headers()?;

        tracing::debug!("POST {url}");

        self.http_client
            .post(&url)
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|e| LlmError::HttpError(format!("Failed to send request: {e}")))
    }

    /// Build the error for a non-2xx response, consuming its body.
    async fn decode_error(response: reqwest::Response) -> LlmError {
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => decode_api_error(status, body),
            Err(e) => LlmError::HttpError(format!(
                "API returned unexpected status code: {status}: {e}"
            )),
        }
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, LlmError> {
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::HttpError(format!("Failed to read response body: {e}")))?;
    if body.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(body)
}

/// Legacy prompt frame from the first message, which must lead with text.
fn legacy_prompt(request: &MessageRequest) -> Result<String, LlmError> {
    let block = request
        .messages
        .first()
        .and_then(|message| message.content.first());
    match block {
        Some(ContentBlock::Text { text }) => Ok(format!("\n\nHuman: {text}\n\nAssistant:")),
        _ => Err(LlmError::InvalidInput(
            "legacy text completions require a leading text message".to_string(),
        )),
    }
}

/// Builder for [`Client`]
///
/// An API key is required, falling back to the `ANTHROPIC_API_KEY`
/// environment variable; everything else defaults per [`crate::defaults`].
/// Setting a Vertex AI project id switches the client to delegated mode,
/// which also needs a location and expects `api_key` to carry a GCP access
/// token rather than an Anthropic key.
#[derive(Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    vertex_project_id: Option<String>,
    vertex_location: Option<String>,
    anthropic_version: Option<String>,
    use_legacy_text_completions: bool,
    http_client: Option<reqwest::Client>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (direct mode) or access token (delegated mode)
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the default model
    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the base URL (direct mode only)
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the Vertex AI project id, switching the client to delegated mode
    pub fn vertex_project_id<S: Into<String>>(mut self, project: S) -> Self {
        self.vertex_project_id = Some(project.into());
        self
    }

    /// Sets the Vertex AI location, e.g. `us-east5` or `global`
    pub fn vertex_location<S: Into<String>>(mut self, location: S) -> Self {
        self.vertex_location = Some(location.into());
        self
    }

    /// Pins the `anthropic-version` header, overriding the per-mode default
    pub fn anthropic_version<S: Into<String>>(mut self, version: S) -> Self {
        self.anthropic_version = Some(version.into());
        self
    }

    /// Routes [`Client::generate`] through the legacy text completions API
    pub const fn legacy_text_completions(mut self, enabled: bool) -> Self {
        self.use_legacy_text_completions = enabled;
        self
    }

    /// Supplies a pre-configured HTTP client, e.g. with proxy settings
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Request timeout for the default HTTP client; ignored when an
    /// explicit `http_client` is supplied
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client, LlmError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or(LlmError::MissingApiKey(
                "Anthropic API key not provided".to_string(),
            ))?;

        if self.vertex_project_id.is_some() != self.vertex_location.is_some() {
            return Err(LlmError::ConfigurationError(
                "Vertex AI mode needs both a project id and a location".to_string(),
            ));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(defaults::http::REQUEST_TIMEOUT))
                .connect_timeout(defaults::http::CONNECT_TIMEOUT)
                .build()
                .map_err(|e| LlmError::HttpError(format!("Failed to build HTTP client: {e}")))?,
        };

        Ok(Client {
            api_key: SecretString::from(api_key),
            model: self
                .model
                .unwrap_or_else(|| defaults::api::DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| defaults::api::BASE_URL.to_string()),
            vertex_project_id: self.vertex_project_id,
            vertex_location: self.vertex_location,
            anthropic_version: self.anthropic_version,
            use_legacy_text_completions: self.use_legacy_text_completions,
            http_client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn direct_client() -> Client {
        Client::builder()
            .api_key("test-key")
            .model("claude-3-5-haiku-20241022")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_fills_default_model() {
        let bare = Client::builder().api_key("test-key").build().unwrap();
        assert_eq!(bare.model(), defaults::api::DEFAULT_MODEL);
        assert_eq!(direct_client().model(), "claude-3-5-haiku-20241022");
    }

    #[test]
    fn test_request_url_direct_mode() {
        let client = direct_client();
        assert_eq!(
            client.request_url("/messages", "claude-3-5-haiku-20241022"),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            client.request_url("/complete", "claude-3-5-haiku-20241022"),
            "https://api.anthropic.com/v1/complete"
        );
    }

    #[test]
    fn test_request_url_vertex_mode_ignores_base_url() {
        let client = Client::builder()
            .api_key("gcp-token")
            .base_url("https://ignored.example.com")
            .vertex_project_id("my-project")
            .vertex_location("us-east5")
            .build()
            .unwrap();

        let url = client.request_url("/messages", "claude-3-5-sonnet-v2@20241022");
        assert_eq!(
            url,
            "https://us-east5-aiplatform.googleapis.com/v1/projects/my-project/locations/us-east5/publishers/anthropic/models/claude-3-5-sonnet-v2@20241022:streamRawPredict"
        );
        assert!(!url.contains("ignored.example.com"));
    }

    #[test]
    fn test_version_defaults_per_mode() {
        assert_eq!(direct_client().resolved_version(), "2023-06-01");

        let vertex = Client::builder()
            .api_key("gcp-token")
            .vertex_project_id("my-project")
            .vertex_location("us-east5")
            .build()
            .unwrap();
        assert_eq!(vertex.resolved_version(), "vertex-2023-10-16");

        let pinned = Client::builder()
            .api_key("test-key")
            .anthropic_version("2024-02-15")
            .build()
            .unwrap();
        assert_eq!(pinned.resolved_version(), "2024-02-15");
    }

    #[test]
    fn test_explicit_version_changes_header_not_url() {
        let plain = direct_client();
        let pinned = Client::builder()
            .api_key("test-key")
            .model("claude-3-5-haiku-20241022")
            .anthropic_version("2024-02-15")
            .build()
            .unwrap();

        assert_eq!(
            plain.request_url("/messages", "m"),
            pinned.request_url("/messages", "m")
        );
        assert_ne!(plain.resolved_version(), pinned.resolved_version());
    }

    #[test]
    fn test_vertex_mode_requires_both_identifiers() {
        let err = Client::builder()
            .api_key("gcp-token")
            .vertex_project_id("my-project")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));

        let err = Client::builder()
            .api_key("gcp-token")
            .vertex_location("us-east5")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[test]
    fn test_headers_per_mode() {
        let headers = direct_client().request_headers().unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
        assert_eq!(headers.get("anthropic-version").unwrap(), "2023-06-01");
        assert!(headers.get("authorization").is_none());

        let vertex = Client::builder()
            .api_key("gcp-token")
            .vertex_project_id("my-project")
            .vertex_location("global")
            .build()
            .unwrap();
        let headers = vertex.request_headers().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer gcp-token");
        assert_eq!(
            headers.get("anthropic-version").unwrap(),
            "vertex-2023-10-16"
        );
        assert!(headers.get("x-api-key").is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", direct_client());
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("claude-3-5-haiku-20241022"));
    }

    #[test]
    fn test_legacy_prompt_frame() {
        let request = MessageRequest::new(vec![ChatMessage::user("What is 2+2?")]);
        assert_eq!(
            legacy_prompt(&request).unwrap(),
            "\n\nHuman: What is 2+2?\n\nAssistant:"
        );

        let empty = MessageRequest::new(vec![]);
        assert!(matches!(
            legacy_prompt(&empty).unwrap_err(),
            LlmError::InvalidInput(_)
        ));
    }
}
