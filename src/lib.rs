//! # Anthropic Client
//!
//! An async client for the Anthropic HTTP API, covering the messages API,
//! the legacy text completions API, token-by-token streaming, and delegated
//! routing through Google Vertex AI.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Two request shapes**: chat-style [`MessageRequest`] with system
//!   instruction, tools and tool choice, and the legacy single-prompt
//!   [`CompletionRequest`]. The two shapes never leak fields into each other.
//! - **Streaming**: attach a per-chunk callback and every content delta is
//!   delivered synchronously, in frame order, while the full response is
//!   assembled for the caller. A [`CancelHandle`] stops the read between
//!   chunks.
//! - **Two addressing modes**: direct (`x-api-key` against
//!   `api.anthropic.com`) or delegated through a Vertex AI project
//!   (`Authorization: Bearer` against the region's raw-predict endpoint),
//!   chosen by whether a project id is configured.
//! - **Structured errors**: non-2xx responses become an
//!   [`LlmError::ApiError`] carrying the status code, the provider's error
//!   type and message, and the raw body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anthropic_client::{ChatMessage, Client, MessageRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .api_key("your-api-key")
//!         .model("claude-3-5-haiku-20241022")
//!         .build()?;
//!
//!     let request = MessageRequest::new(vec![ChatMessage::user("Hello!")])
//!         .with_max_tokens(1024);
//!     let response = client.create_message(&request).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use anthropic_client::{CancelHandle, ChatMessage, Client, MessageRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder().api_key("your-api-key").build()?;
//!
//!     let cancel = CancelHandle::new();
//!     let request = MessageRequest::new(vec![ChatMessage::user("Tell me a story")])
//!         .with_max_tokens(1024)
//!         .with_streaming_func(Arc::new(|chunk| {
//!             print!("{}", String::from_utf8_lossy(chunk));
//!             Ok(())
//!         }))
//!         .with_cancel_handle(cancel.clone());
//!
//!     // cancel.cancel() from another task stops the stream between chunks
//!     let response = client.create_message(&request).await?;
//!     println!("\nstop reason: {:?}", response.stop_reason);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod defaults;
pub mod error;
mod payload;
mod streaming;
pub mod types;
pub mod utils;

pub use client::{Client, ClientBuilder};
pub use error::LlmError;
pub use types::{
    ChatMessage, Completion, CompletionRequest, ContentBlock, MessageRequest, MessageResponse,
    Role, StreamingFunc, Tool, ToolChoice, ToolFunction, Usage,
};
pub use utils::cancel::CancelHandle;
