//! Event sink through which a call reports its progress.

use serde_json::Value;

use crate::domain::error::ErrorEnvelope;

/// Notifications of one call.
///
/// `on_loading_start` fires once before the request is sent. Afterwards
/// exactly one of `on_finished` / `on_error` fires, unless the caller
/// cancelled the call. All methods default to doing nothing.
pub trait JsonEvents: Send + Sync {
    /// The request is about to be sent
    fn on_loading_start(&self) {}

    /// The call succeeded; `None` when the server returned no content or `null`
    fn on_finished(&self, _value: Option<&Value>) {}

    /// The call failed
    fn on_error(&self, _error: &ErrorEnvelope) {}
}

/// Sink that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl JsonEvents for NoopEvents {}
