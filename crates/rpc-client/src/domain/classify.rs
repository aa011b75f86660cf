//! Error Classifier - maps failed exchanges to error envelopes.
//!
//! | Status   | Kind               | Recovery                            |
//! |----------|--------------------|-------------------------------------|
//! | 401, 403 | Unauthorized       | no                                  |
//! | 404      | NotFound           | no                                  |
//! | 500      | InternalError      | RecoverableTimeout past threshold   |
//! | 503      | ServiceUnavailable | no                                  |
//! | 0        | Aborted            | no                                  |
//! | other    | HttpStatus         | no                                  |
//!
//! A 500 is only treated as a proxy timeout when the call was registered for
//! recovery and has been running for at least the threshold. Below it the
//! 500 is a genuine server fault.

use std::time::Duration;

use crate::domain::error::{ErrorEnvelope, ErrorKind, SYNTHETIC_ERROR_ID};
use crate::domain::response::{unwrap_response, ParsedResponse, UnwrapError};

/// Default age at which a 500 is presumed to be a proxy timeout
pub const RECOVERY_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Outcome of classifying a non-200 response
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Report this error to the caller
    Terminal(ErrorEnvelope),
    /// Keep waiting: poll for the pending request instead of failing
    RecoverableTimeout,
}

impl Classification {
    /// Kind of the terminal error, None for recoverable timeouts
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Classification::Terminal(error) => Some(error.kind),
            Classification::RecoverableTimeout => None,
        }
    }
}

/// Maps HTTP statuses and transport failures to error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClassifier {
    threshold: Duration,
}

impl ErrorClassifier {
    /// Classifier escalating 500s older than `threshold`
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Escalation threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Classify a non-200 status.
    ///
    /// `recovery_elapsed` is the age of the call's pending request; pass
    /// `None` when recovery is disabled or no request is registered.
    pub fn classify_status(
        &self,
        status: u16,
        status_text: &str,
        recovery_elapsed: Option<Duration>,
    ) -> Classification {
        let envelope = match status {
            401 | 403 => ErrorEnvelope::new(
                ErrorKind::Unauthorized,
                status.to_string(),
                "Not Authorized",
                "You are not authorized to server. Your session might have expired. \
                 Please refresh the browser window to re-login.",
            ),
            404 => ErrorEnvelope::new(
                ErrorKind::NotFound,
                status.to_string(),
                "Not found",
                "Server is probably being restarted at the moment. Please try again later.",
            ),
            500 => {
                if recovery_elapsed.is_some_and(|elapsed| elapsed >= self.threshold) {
                    return Classification::RecoverableTimeout;
                }
                Self::internal_error()
            }
            503 => ErrorEnvelope::new(
                ErrorKind::ServiceUnavailable,
                status.to_string(),
                "Server Temporarily Unavailable",
                "Server is temporarily unavailable. Please try again later.",
            ),
            0 => ErrorEnvelope::new(
                ErrorKind::Aborted,
                status.to_string(),
                "Aborted",
                "Can't contact remote server, connection was lost.",
            ),
            _ => ErrorEnvelope::new(
                ErrorKind::HttpStatus,
                status.to_string(),
                status_text,
                format!(
                    "Server responded with HTTP error: {} - {}",
                    status, status_text
                ),
            ),
        };

        Classification::Terminal(envelope)
    }

    /// Envelope for a 500 that is not a recoverable timeout
    pub fn internal_error() -> ErrorEnvelope {
        ErrorEnvelope::new(
            ErrorKind::InternalError,
            "500",
            "ServerInternalError",
            "Server encounter internal error while processing your request. \
             Please report this error and retry.",
        )
    }

    /// Envelope for a request that never reached the server.
    ///
    /// A description that is itself an error object is passed through.
    pub fn transport_failure(&self, description: Option<&str>) -> ErrorEnvelope {
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let Some(description) = description else {
            return ErrorEnvelope::new(
                ErrorKind::TransportFailure,
                SYNTHETIC_ERROR_ID,
                "Cross-site request",
                "Cross-site request was blocked by browser.",
            );
        };

        match unwrap_response(description, None) {
            Ok(ParsedResponse::Error(error)) => error,
            _ => ErrorEnvelope::new(
                ErrorKind::TransportFailure,
                SYNTHETIC_ERROR_ID,
                "TransportFailure",
                description,
            ),
        }
    }

    /// Envelope for a 200 response whose body could not be parsed
    pub fn malformed(&self, error: &UnwrapError) -> ErrorEnvelope {
        ErrorEnvelope::new(
            ErrorKind::MalformedResponse,
            SYNTHETIC_ERROR_ID,
            "MalformedResponse",
            format!("Server response could not be parsed: {}", error),
        )
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(RECOVERY_THRESHOLD)
    }
}
