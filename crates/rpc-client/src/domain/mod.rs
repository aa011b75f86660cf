//! Domain types for the RPC client.
//!
//! Pure data and algorithms: payload building, correlation tokens, the
//! pending request tracker, response unwrapping and error classification.
//! The only I/O is in `config`, which reads the config file and the
//! environment.

pub mod classify;
pub mod config;
pub mod correlation;
pub mod error;
pub mod payload;
pub mod pending;
pub mod response;

// Re-exports for convenience
pub use classify::{Classification, ErrorClassifier};
pub use config::{ClientConfig, ConfigError};
pub use correlation::CorrelationToken;
pub use error::{ErrorEnvelope, ErrorKind, PayloadError};
pub use payload::{Payload, PayloadValue};
pub use pending::{PendingRequest, PendingRequestTracker};
pub use response::{unwrap_response, ParsedResponse, UnwrapError};
