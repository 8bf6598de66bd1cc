//! Default Configuration Values
//!
//! This module centralizes all default values used by the client. Having
//! defaults in one place makes them easier to maintain, document, and adjust,
//! and keeps the override precedence explicit: explicit configuration >
//! mode-specific default > global default.

use std::time::Duration;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default request timeout for HTTP requests
    ///
    /// Set to 60 seconds to accommodate large language models that may take
    /// 10-20 seconds to respond, plus network latency and proxy delays.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default connection timeout for establishing HTTP connections
    ///
    /// Set to 10 seconds which is sufficient for most network conditions
    /// while not being too aggressive.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// API endpoint and protocol defaults
pub mod api {
    /// Default base URL for the Anthropic API (direct mode)
    ///
    /// A configured base URL has any trailing `/` trimmed before paths are
    /// appended, so both `https://host/v1` and `https://host/v1/` work.
    pub const BASE_URL: &str = "https://api.anthropic.com/v1";

    /// Default `anthropic-version` header value in direct mode
    pub const ANTHROPIC_VERSION: &str = "2023-06-01";

    /// Default `anthropic-version` header value when routing through
    /// Google Vertex AI (delegated mode)
    pub const VERTEX_ANTHROPIC_VERSION: &str = "vertex-2023-10-16";

    /// Default model used when neither the client nor the request names one
    pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
}
