//! Error types for the Voxa client.
//!
//! Every network operation returns [`ApiError`]. Its body is either the
//! server's own JSON error body, passed through untouched, or a synthesized
//! `{ "error": "<fallback>" }` object, so callers always have one shape to
//! branch on.

use serde_json::{json, Value};

/// Where a failed call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout, DNS failure, refused connection
    Network,
    /// Server answered with a non-2xx status
    Server,
    /// Server answered 2xx but the body could not be parsed
    MalformedResponse,
}

/// Normalized error returned by every [`crate::SessionClient`] operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<u16>,
    body: Value,
}

impl ApiError {
    /// Synthesize `{ "error": message }`.
    pub fn fallback(kind: ErrorKind, status: Option<u16>, message: &str) -> Self {
        Self {
            kind,
            status,
            body: json!({ "error": message }),
        }
    }

    /// Transport failed before any response arrived.
    pub fn network(message: &str) -> Self {
        Self::fallback(ErrorKind::Network, None, message)
    }

    /// Normalize a non-2xx response.
    ///
    /// A JSON object or array is kept verbatim. Empty, non-JSON and scalar
    /// bodies (`null`, `""`, `false`, a bare string) are replaced by the
    /// fallback message.
    pub fn from_response(status: u16, raw_body: &str, fallback: &str) -> Self {
        match serde_json::from_str::<Value>(raw_body) {
            Ok(body @ (Value::Object(_) | Value::Array(_))) => Self {
                kind: ErrorKind::Server,
                status: Some(status),
                body,
            },
            _ => Self::fallback(ErrorKind::Server, Some(status), fallback),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The normalized body (`{ "error": ... }` or the server's own body).
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// True when the server rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Human-readable message.
    ///
    /// Prefers the `error` field, then `message`, then the raw body.
    pub fn message(&self) -> String {
        for key in ["error", "message"] {
            if let Some(text) = self.body.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
        match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.status) {
            (ErrorKind::Network, _) => write!(f, "Network error: {}", self.message()),
            (ErrorKind::Server, Some(status)) => {
                write!(f, "Server error ({}): {}", status, self.message())
            }
            (ErrorKind::Server, None) => write!(f, "Server error: {}", self.message()),
            (ErrorKind::MalformedResponse, _) => {
                write!(f, "Malformed response: {}", self.message())
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Token storage failures. Logged by the client, never surfaced from
/// network operations.
#[derive(Debug)]
pub enum StorageError {
    /// The backing store could not be opened
    Unavailable(String),
    Read(String),
    Write(String),
    Delete(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable(e) => write!(f, "Token storage unavailable: {}", e),
            StorageError::Read(e) => write!(f, "Failed to read token: {}", e),
            StorageError::Write(e) => write!(f, "Failed to store token: {}", e),
            StorageError::Delete(e) => write!(f, "Failed to delete token: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}
