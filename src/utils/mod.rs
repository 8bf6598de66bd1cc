//! Utility modules
//!
//! This module contains various utility functions and types used throughout the library.

pub mod cancel;
pub mod http_headers;
pub mod url;

pub use cancel::CancelHandle;
pub use url::*;
