//! Recovery Coordinator - counts calls currently being recovered.
//!
//! One coordinator is shared by every client created from the same
//! factory. It owns the visibility of the processing indicator: the
//! indicator is shown when the first recovery begins and hidden when the
//! last one ends.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::indicator::TracingIndicator;
use crate::ports::outbound::ProcessingIndicator;

#[derive(Debug, Default)]
struct CoordinatorState {
    in_flight: usize,
    shown: bool,
}

/// Shared count of in-flight recoveries.
pub struct RecoveryCoordinator {
    state: Mutex<CoordinatorState>,
    indicator: Arc<dyn ProcessingIndicator>,
}

impl RecoveryCoordinator {
    /// Coordinator reporting through the tracing indicator
    pub fn new() -> Self {
        Self::with_indicator(Arc::new(TracingIndicator))
    }

    /// Coordinator driving a custom indicator
    pub fn with_indicator(indicator: Arc<dyn ProcessingIndicator>) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            indicator,
        }
    }

    /// A call entered recovery. Returns the new count.
    pub fn begin_recovery(&self) -> usize {
        let mut state = self.state.lock();
        state.in_flight += 1;
        self.indicator.update(state.in_flight);

        if !state.shown {
            state.shown = true;
            self.indicator.show(state.in_flight);
        }

        debug!(in_flight = state.in_flight, "Recovery started");
        state.in_flight
    }

    /// Count a call as recovering until the returned guard is dropped.
    pub fn enter(&self) -> RecoveryGuard<'_> {
        let in_flight = self.begin_recovery();
        RecoveryGuard {
            coordinator: self,
            in_flight,
        }
    }

    /// A call left recovery. Returns the new count.
    pub fn end_recovery(&self) -> usize {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.indicator.update(state.in_flight);

        if state.shown && state.in_flight == 0 {
            state.shown = false;
            self.indicator.hide();
        }

        debug!(in_flight = state.in_flight, "Recovery finished");
        state.in_flight
    }

    /// Number of calls currently being recovered
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Whether the indicator is currently visible
    pub fn is_shown(&self) -> bool {
        self.state.lock().shown
    }
}

/// One call in recovery. Dropping it ends the recovery, also when the
/// polling future is dropped before it completes.
#[must_use = "the recovery ends when the guard is dropped"]
pub struct RecoveryGuard<'a> {
    coordinator: &'a RecoveryCoordinator,
    in_flight: usize,
}

impl RecoveryGuard<'_> {
    /// Count right after this call entered recovery
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Drop for RecoveryGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.end_recovery();
    }
}

impl Default for RecoveryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
