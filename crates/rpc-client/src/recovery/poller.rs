//! Polling Scheduler - waits for the result of a timed-out call.
//!
//! ## State Machine
//!
//! ```text
//! [Waiting] ──begin_polling──→ [Polling] ──record finished──→ [Resolved]
//!     │                            │
//!     └────────cancel()────────────┴──────────────────────→ [Cancelled]
//! ```
//!
//! `Resolved` and `Cancelled` are terminal. The transition into either is a
//! compare-and-set on the shared state, so of a late poll result and a
//! concurrent cancellation exactly one wins.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::correlation::CorrelationToken;
use crate::managers::UtilsManager;
use crate::recovery::coordinator::RecoveryCoordinator;

/// Recovery state of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Call in flight, not polling
    Waiting,
    /// Call timed out, querying the pending request periodically
    Polling,
    /// Result delivered
    Resolved,
    /// Caller gave up
    Cancelled,
}

impl PollState {
    /// True for `Resolved` and `Cancelled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Resolved | PollState::Cancelled)
    }
}

/// Shared handle to the recovery state of one call.
///
/// Clones observe and control the same call.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<watch::Sender<PollState>>,
}

impl CancelHandle {
    /// Handle in the `Waiting` state
    pub fn new() -> Self {
        let (state, _) = watch::channel(PollState::Waiting);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current state
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Stop the call. Its outcome will not be delivered.
    ///
    /// Returns false if the call already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.transition(|state| !state.is_terminal(), PollState::Cancelled)
    }

    /// True once `cancel()` took effect
    pub fn is_cancelled(&self) -> bool {
        self.state() == PollState::Cancelled
    }

    /// Waiting -> Polling
    pub(crate) fn begin_polling(&self) -> bool {
        self.transition(|state| *state == PollState::Waiting, PollState::Polling)
    }

    /// Waiting | Polling -> Resolved. Only one caller ever gets `true`.
    pub(crate) fn resolve(&self) -> bool {
        self.transition(|state| !state.is_terminal(), PollState::Resolved)
    }

    fn transition(&self, allowed: impl Fn(&PollState) -> bool, next: PollState) -> bool {
        self.state.send_if_modified(|state| {
            if allowed(state) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// How polling ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The server finished the call; `result` as recorded on the pending request
    Resolved(Option<serde_json::Value>),
    /// The caller cancelled before a result was found
    Cancelled,
}

/// Periodically asks the server whether a pending request has finished.
///
/// Polling has no upper bound; it ends when the server reports the request
/// as finished or when the call is cancelled. Failed queries are logged and
/// retried on the next tick.
#[derive(Clone)]
pub struct PollingScheduler {
    interval: Duration,
    coordinator: Arc<RecoveryCoordinator>,
    utils: UtilsManager,
}

impl PollingScheduler {
    /// Create a scheduler querying through `utils` every `interval`
    pub fn new(interval: Duration, coordinator: Arc<RecoveryCoordinator>, utils: UtilsManager) -> Self {
        Self {
            interval,
            coordinator,
            utils,
        }
    }

    /// Delay between two queries
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the pending request of `token` finishes or `control` is
    /// cancelled.
    ///
    /// The first query is sent one interval after the call starts polling.
    /// The coordinator counts the call for the whole time it is polling,
    /// including when this future is dropped before it completes.
    pub async fn run(&self, token: &CorrelationToken, control: &CancelHandle) -> PollOutcome {
        if !control.begin_polling() {
            return PollOutcome::Cancelled;
        }

        let recovery = self.coordinator.enter();
        info!(
            token = %token,
            in_flight = recovery.in_flight(),
            "Call timed out at proxy, polling for result"
        );

        self.poll(token, control).await
    }

    async fn poll(&self, token: &CorrelationToken, control: &CancelHandle) -> PollOutcome {
        let mut cancelled = control.subscribe();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = wait_cancelled(&mut cancelled) => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            debug!(token = %token, "Querying pending request");

            let status = tokio::select! {
                _ = wait_cancelled(&mut cancelled) => return PollOutcome::Cancelled,
                status = self.utils.get_pending_request(token) => status,
            };

            match status {
                Ok(Some(status)) if status.is_finished_for(token) => {
                    if !control.resolve() {
                        return PollOutcome::Cancelled;
                    }
                    debug!(token = %token, end_time = ?status.end_time, "Pending request finished");
                    return PollOutcome::Resolved(status.result);
                }
                Ok(_) => {
                    debug!(token = %token, "Pending request still running");
                }
                Err(error) => {
                    warn!(token = %token, error = %error, "Pending request query failed, retrying");
                }
            }
        }
    }
}

async fn wait_cancelled(state: &mut watch::Receiver<PollState>) {
    // The sender lives in the handle the caller borrows, so this only
    // returns on cancellation.
    let _ = state.wait_for(|state| *state == PollState::Cancelled).await;
}
