//! `utilsManager` calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::domain::correlation::CorrelationToken;
use crate::domain::error::{ErrorEnvelope, ErrorKind, SYNTHETIC_ERROR_ID};
use crate::service::{CallOutcome, ClientContext, RequestClient};

/// Server-side record of a call made with a correlation token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestStatus {
    /// Token the call was registered under
    #[serde(default)]
    pub callback_name: Option<String>,
    /// When the server started processing (ms since epoch)
    #[serde(default)]
    pub start_time: u64,
    /// When the server finished; absent or 0 while still running
    #[serde(default)]
    pub end_time: Option<u64>,
    /// Return value (or exception) of the call
    #[serde(default)]
    pub result: Option<Value>,
    /// Manager that served the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    /// Method that served the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl PendingRequestStatus {
    /// True when this record is the finished request of `token`.
    ///
    /// A record without a callback name is accepted, it was looked up by
    /// that very token.
    pub fn is_finished_for(&self, token: &CorrelationToken) -> bool {
        let finished = self.end_time.is_some_and(|end| end > 0);
        let matches = self
            .callback_name
            .as_deref()
            .map_or(true, |name| name == token.as_str());
        finished && matches
    }
}

/// Client of the server's `utilsManager`.
#[derive(Clone)]
pub struct UtilsManager {
    context: Arc<ClientContext>,
}

impl UtilsManager {
    pub(crate) fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }

    /// Look up the server record of the call registered under `token`.
    ///
    /// The query itself is sent without a token and is never recovered.
    /// `Ok(None)` means the server returned nothing for the token.
    pub async fn get_pending_request(
        &self,
        token: &CorrelationToken,
    ) -> Result<Option<PendingRequestStatus>, ErrorEnvelope> {
        let mut client = RequestClient::new(self.context.clone(), false);
        client.put("callbackName", token.as_str())?;

        let path = &self.context.config.recovery.pending_request_path;
        match client.call_once(path).await {
            CallOutcome::Finished(None) | CallOutcome::Abandoned => Ok(None),
            CallOutcome::Finished(Some(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| {
                    ErrorEnvelope::new(
                        ErrorKind::MalformedResponse,
                        SYNTHETIC_ERROR_ID,
                        "MalformedResponse",
                        format!("Pending request record could not be read: {}", e),
                    )
                }),
            CallOutcome::Failed(error) => Err(error),
        }
    }
}
