//! Error types for the RPC client.
//!
//! [`ErrorEnvelope`] is what callers receive through `on_error`. It has the
//! same wire shape the server uses for its exceptions (`errorId`, `name`,
//! `message`) so that application errors returned with HTTP 200 and errors
//! synthesized by the client look alike.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error id used for envelopes synthesized without an HTTP status
pub const SYNTHETIC_ERROR_ID: &str = "0";

/// Category of a delivered error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Business operation failed, returned by the server with HTTP 200
    #[default]
    Application,
    /// HTTP 401 / 403
    Unauthorized,
    /// HTTP 404
    NotFound,
    /// HTTP 500 that is not eligible for recovery
    InternalError,
    /// HTTP 503
    ServiceUnavailable,
    /// No HTTP exchange completed (status 0)
    Aborted,
    /// HTTP 200 with a body that is not valid JSON
    MalformedResponse,
    /// Request never reached the server
    TransportFailure,
    /// Any other HTTP status
    HttpStatus,
    /// Payload could not be built
    InvalidPayload,
}

impl ErrorKind {
    /// True for errors produced by the server's business logic
    pub fn is_application(&self) -> bool {
        matches!(self, ErrorKind::Application)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Application => "application",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not-found",
            ErrorKind::InternalError => "internal-error",
            ErrorKind::ServiceUnavailable => "service-unavailable",
            ErrorKind::Aborted => "aborted",
            ErrorKind::MalformedResponse => "malformed-response",
            ErrorKind::TransportFailure => "transport-failure",
            ErrorKind::HttpStatus => "http-status",
            ErrorKind::InvalidPayload => "invalid-payload",
        };
        f.write_str(name)
    }
}

/// Error delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Server error id, or the HTTP status for HTTP errors
    pub error_id: String,
    /// Exception name (e.g. `CantBeApprovedException`)
    #[serde(default)]
    pub name: String,
    /// Human readable message
    pub message: String,
    /// URL of the failed request
    #[serde(rename = "requestURL", default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    /// Serialized payload of the failed request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
    /// Category assigned by the client
    #[serde(skip)]
    pub kind: ErrorKind,
    /// Full object as returned by the server, for application errors
    #[serde(skip)]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    /// Create an envelope of the given kind
    pub fn new(
        kind: ErrorKind,
        error_id: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error_id: error_id.into(),
            name: name.into(),
            message: message.into(),
            request_url: None,
            post_data: None,
            kind,
            details: None,
        }
    }

    /// Create an application error, as the server would have returned it
    pub fn create_new(
        error_id: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Application, error_id, name, message)
    }

    /// Read an application error out of a response value.
    ///
    /// A value is an error when it is an object whose `errorId` and
    /// `message` are both present and not null.
    pub fn from_application_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let error_id = match object.get("errorId") {
            None | Some(Value::Null) => return None,
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        };
        let message = match object.get("message") {
            None | Some(Value::Null) => return None,
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
        };
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut envelope = Self::create_new(error_id, name, message);
        envelope.details = Some(value.clone());
        Some(envelope)
    }

    /// Attach the request URL and the posted payload
    pub fn with_request(mut self, request_url: impl Into<String>, post_data: impl Into<String>) -> Self {
        self.request_url = Some(request_url.into());
        self.post_data = Some(post_data.into());
        self
    }

    /// True when the server reported this exception name
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.error_id, self.name, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

/// Problems while building a payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// Parameter names must not be empty
    #[error("parameter name cannot be empty")]
    EmptyName,
    /// Structured value could not be projected to JSON
    #[error("cannot serialize parameter: {0}")]
    Serialize(String),
    /// Enum value does not serialize to its name
    #[error("enum value does not serialize to a name: {0}")]
    NotSymbolic(String),
}

impl From<PayloadError> for ErrorEnvelope {
    fn from(e: PayloadError) -> Self {
        ErrorEnvelope::new(ErrorKind::InvalidPayload, SYNTHETIC_ERROR_ID, "InvalidPayload", e.to_string())
    }
}
