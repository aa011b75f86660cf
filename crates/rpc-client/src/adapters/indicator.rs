//! Processing indicator that reports through `tracing`.

use tracing::info;

use crate::ports::outbound::ProcessingIndicator;

/// Text shown while calls are being recovered
pub fn processing_message(remaining: usize) -> String {
    format!(
        "Processing of your request(s) is taking longer than usual, but it's actively \
         processed by the server. Please do not close opened window/tab nor repeat your \
         action. You will be notified once operation completes. Remaining requests: {}",
        remaining
    )
}

/// Default indicator: logs every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingIndicator;

impl ProcessingIndicator for TracingIndicator {
    fn show(&self, remaining: usize) {
        info!(remaining = remaining, "{}", processing_message(remaining));
    }

    fn update(&self, remaining: usize) {
        info!(remaining = remaining, "Long running requests remaining");
    }

    fn hide(&self) {
        info!("All long running requests completed");
    }
}
