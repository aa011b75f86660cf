//! Typed wrappers around server manager methods used by the client itself.

pub mod utils;

pub use utils::{PendingRequestStatus, UtilsManager};
