//! Recovery of calls cut off by a proxy timeout.
//!
//! - [`RecoveryCoordinator`]: process-wide count of recovering calls
//! - [`PollingScheduler`]: periodic pending request queries for one call
//! - [`CancelHandle`]: exactly-once gate between delivery and cancellation

pub mod coordinator;
pub mod poller;

pub use coordinator::{RecoveryCoordinator, RecoveryGuard};
pub use poller::{CancelHandle, PollOutcome, PollState, PollingScheduler};
