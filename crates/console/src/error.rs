//! Unified error handling for the console.
//!
//! Every failure a console operation can surface falls into one of four
//! kinds. The kind decides what happens next: validation errors are fixed by
//! the user, authorization errors end the session, not-found errors are
//! terminal for the operation, and network errors leave the form editable for
//! a manual retry. Nothing is retried automatically.

use customer_console_core::FieldErrors;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// The category of a [`ConsoleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server (or the form) rejected the submitted values.
    Validation,
    /// Bad credentials, or the session is missing, expired or rejected.
    Auth,
    /// The target record no longer exists.
    NotFound,
    /// Transport failure or an unexpected server response.
    Network,
}

impl ErrorKind {
    /// Stable code shown as the title of failure notifications.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Network => "NETWORK_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Application-level error type for the console.
#[derive(Debug, Clone, Error)]
pub enum ConsoleError {
    /// Submitted values were rejected.
    #[error("Validation failed: {message}")]
    Validation {
        /// Summary message from the server.
        message: String,
        /// Per-field messages, when the server supplied them.
        fields: FieldErrors,
    },

    /// Authentication failed or the session is no longer valid.
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// The target record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request did not complete or the response was unusable.
    #[error("Network error: {0}")]
    Network(String),
}

impl ConsoleError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Network(_) => ErrorKind::Network,
        }
    }

    /// The human-readable detail without the kind prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation { message, .. } => message,
            Self::Auth(message) | Self::NotFound(message) | Self::Network(message) => message,
        }
    }

    /// Returns `true` for authorization failures.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// A validation error raised before anything was sent.
    #[must_use]
    pub fn invalid_form(fields: FieldErrors) -> Self {
        Self::Validation {
            message: "Please correct the highlighted fields".to_string(),
            fields,
        }
    }

    /// Map an unsuccessful HTTP response to an error.
    ///
    /// `body` is the raw response body; the backend's JSON error envelope is
    /// used for the detail message when it can be decoded.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let envelope = ApiErrorBody::parse(body);
        let server_message = envelope.as_ref().and_then(ApiErrorBody::message);

        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::CONFLICT
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation {
                message: server_message.unwrap_or_else(|| "Request was rejected".to_string()),
                fields: envelope
                    .as_ref()
                    .map(ApiErrorBody::field_errors)
                    .unwrap_or_default(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(
                server_message.unwrap_or_else(|| "Session is no longer valid".to_string()),
            ),
            StatusCode::NOT_FOUND => {
                Self::NotFound(server_message.unwrap_or_else(|| "Resource not found".to_string()))
            }
            _ => Self::Network(match server_message {
                Some(message) => format!("HTTP {status}: {message}"),
                None => format!("HTTP {status}"),
            }),
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if err.is_decode() {
            Self::Network(format!("unexpected response body: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Error envelope returned by the backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Request path that failed.
    #[serde(default)]
    pub path: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// HTTP status code repeated in the body.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Per-field validation messages, as a `{field: message}` object.
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Decode an error envelope, if the body is one.
    #[must_use]
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// The non-blank server message.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
    }

    /// Field messages from `errors`; anything other than string values is ignored.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        self.errors
            .as_ref()
            .and_then(serde_json::Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|(field, message)| {
                        message.as_str().map(|m| (field.clone(), m.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
