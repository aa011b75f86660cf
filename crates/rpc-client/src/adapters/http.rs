//! [`reqwest`]-backed implementation of [`HttpTransport`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::domain::config::HttpConfig;
use crate::ports::outbound::{HttpResponse, HttpTransport, TransportError};

/// Content type of every call body
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// HTTP transport using a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default settings.
    pub fn new() -> Self {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a transport from configuration.
    ///
    /// Only connection establishment is bounded; a call may legitimately run
    /// for as long as the server needs.
    ///
    /// Falls back to reqwest's defaults, dropping the configured timeout and
    /// user agent, if the client cannot be built.
    pub fn from_config(config: &HttpConfig) -> Self {
        Self::try_from_config(config).unwrap_or_else(|e| {
            warn!(error = %e, "HTTP client settings rejected, using defaults");
            Self {
                inner: reqwest::Client::new(),
            }
        })
    }

    /// Create a transport from configuration, failing on settings reqwest
    /// rejects (for example a user agent that is not a valid header value).
    pub fn try_from_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { inner })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let response = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Interrupted(e.to_string()))?;

        debug!(url = url, status = status.as_u16(), bytes = text.len(), "Received response");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: text,
        })
    }
}

/// Errors before any byte reached the server vs. errors mid-exchange
fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_builder() || e.is_connect() {
        TransportError::NotSent(e.to_string())
    } else {
        TransportError::Interrupted(e.to_string())
    }
}
