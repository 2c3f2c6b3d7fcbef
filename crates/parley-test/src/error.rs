//! Test error types.

use thiserror::Error;

/// Errors raised by the test helpers.
#[derive(Debug, Error)]
pub enum TestError {
    /// Building the HTTP request failed.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// Reading the response body failed.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
