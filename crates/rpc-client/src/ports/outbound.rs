//! Outbound ports of the RPC client.

use async_trait::async_trait;
use thiserror::Error;

/// Response of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase for the status
    pub status_text: String,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Build a response
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// HTTP 200 with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, "OK", body)
    }

    /// Only 200 counts as success
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Failure before a complete HTTP response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never reached the server (connect failure, bad URL, ...)
    #[error("request not sent: {0}")]
    NotSent(String),
    /// The exchange started but no complete response arrived
    #[error("exchange interrupted: {0}")]
    Interrupted(String),
}

/// Minimal HTTP client: the RPC protocol only ever POSTs.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url` and return the response, whatever its status.
    async fn post(&self, url: &str, body: String) -> Result<HttpResponse, TransportError>;
}

/// Visible "still processing" indicator driven by the recovery coordinator.
pub trait ProcessingIndicator: Send + Sync {
    /// Make the indicator visible
    fn show(&self, remaining: usize);
    /// Update the number of calls still being recovered
    fn update(&self, remaining: usize);
    /// Hide the indicator
    fn hide(&self);
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            // Clock before Unix epoch - tokens stay increasing anyway
            .unwrap_or(0)
    }
}
