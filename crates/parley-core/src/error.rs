//! Error types for Parley.
//!
//! [`BotError`] is the single error type that flows out of handlers, the
//! router, middleware and the conversation client. The router never wraps or
//! swallows it; the HTTP boundary is the only place that turns it into a
//! response, using [`BotError::status_code`] and [`BotError::to_envelope`].
//!
//! "No route matched" and "middleware short-circuited" are not errors and have
//! no variant here.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`BotError`].
pub type BotResult<T> = Result<T, BotError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The inbound payload was not usable (bad activity, bad typed value).
    BadRequest,
    /// A handler failed.
    Handler,
    /// The conversation service rejected or failed a call.
    Upstream,
    /// The turn was cancelled or ran out of time.
    Cancelled,
    /// Anything else that went wrong inside the bot.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Handler | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Standard error type for Parley.
///
/// # Example
///
/// ```
/// use parley_core::{BotError, ErrorCategory};
///
/// fn check(text: Option<&str>) -> Result<&str, BotError> {
///     text.ok_or_else(|| BotError::handler("message had no text"))
/// }
///
/// let err = check(None).unwrap_err();
/// assert_eq!(err.category(), ErrorCategory::Handler);
/// ```
#[derive(Error, Debug)]
pub enum BotError {
    /// The request body could not be read as an activity.
    #[error("Invalid activity: {message}")]
    InvalidActivity {
        /// Human-readable error message.
        message: String,
    },

    /// An activity value could not be narrowed into the requested type.
    #[error("Failed to narrow activity '{name}': {source}")]
    Narrowing {
        /// Route key of the activity being narrowed (`type` or `type/name`).
        name: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A typed route matched but the activity carried no value.
    #[error("Activity '{name}' has no value to narrow")]
    MissingValue {
        /// Route key of the activity being narrowed.
        name: String,
    },

    /// A handler returned an error.
    #[error("Handler error: {message}")]
    Handler {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The conversation client failed.
    #[error("Conversation client error: {message}")]
    Client {
        /// Human-readable error message.
        message: String,
        /// HTTP status returned by the service, when there was one.
        status: Option<u16>,
    },

    /// A response could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The turn was cancelled before it completed.
    #[error("Turn cancelled: {message}")]
    Cancelled {
        /// Human-readable error message.
        message: String,
    },
}

impl BotError {
    /// Creates an invalid activity error.
    #[must_use]
    pub fn invalid_activity(message: impl Into<String>) -> Self {
        Self::InvalidActivity {
            message: message.into(),
        }
    }

    /// Creates a handler error with a message.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler error wrapping a source error.
    pub fn handler_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Handler {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a conversation client error.
    #[must_use]
    pub fn client(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Client {
            message: message.into(),
            status,
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidActivity { .. } | Self::Narrowing { .. } | Self::MissingValue { .. } => {
                ErrorCategory::BadRequest
            }
            Self::Handler { .. } => ErrorCategory::Handler,
            Self::Client { .. } => ErrorCategory::Upstream,
            Self::Serialization(_) => ErrorCategory::Internal,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, turn_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            turn_id: turn_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidActivity { .. } => "INVALID_ACTIVITY",
            Self::Narrowing { .. } => "INVALID_ACTIVITY_VALUE",
            Self::MissingValue { .. } => "MISSING_ACTIVITY_VALUE",
            Self::Handler { .. } => "HANDLER_ERROR",
            Self::Client { .. } => "CONVERSATION_CLIENT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Cancelled { .. } => "TURN_CANCELLED",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Narrowing { name, .. } | Self::MissingValue { name } => {
                Some(serde_json::json!({ "activity": name }))
            }
            Self::Client {
                status: Some(status),
                ..
            } => Some(serde_json::json!({ "upstream_status": status })),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The turn ID for log correlation.
    #[serde(rename = "turnId", skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
