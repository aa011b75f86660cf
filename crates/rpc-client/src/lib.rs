//! Perun RPC Client - JSON calls to the Perun API that survive proxy timeouts.
//!
//! Every call is an HTTP POST of a JSON object to `rpc_url + path`. When
//! recovery is enabled for a call, the client also sends a correlation token
//! (`?callback=<token>`). If an intermediary then cuts the request off with
//! HTTP 500 after the server has been working on it for a long time, the
//! client does not fail the call. It keeps asking the server for the
//! pending request registered under the same token until the result is
//! available.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                             REQUEST CLIENT                                  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  put(..) ──► Payload ──► call(path)                                         │
//! │                            │                                                │
//! │                            ├─► PendingRequestTracker.register(token)        │
//! │                            ├─► JsonEvents.on_loading_start()                │
//! │                            ▼                                                │
//! │                     HttpTransport.post(url, body)                           │
//! │                            │                                                │
//! │             ┌──────────────┼───────────────────────┐                        │
//! │             ▼              ▼                       ▼                        │
//! │         HTTP 200       HTTP != 200          transport failure               │
//! │      unwrap_response   ErrorClassifier      synthetic envelope              │
//! │             │              │                       │                        │
//! │             │     RecoverableTimeout?              │                        │
//! │             │        │          │                  │                        │
//! │             │        ▼          ▼                  │                        │
//! │             │  PollingScheduler  terminal error    │                        │
//! │             │  (RecoveryCoordinator counts)        │                        │
//! │             ▼        ▼          ▼                  ▼                        │
//! │        JsonEvents.on_finished(..) / JsonEvents.on_error(..)  (exactly once) │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use perun_rpc_client::{ClientConfig, ClientFactory, CallOutcome};
//!
//! let factory = ClientFactory::from_config(ClientConfig::default())?;
//! let mut client = factory.client_with_recovery();
//! client.put("id", 42)?;
//! match client.call("usersManager/getUserById").await {
//!     CallOutcome::Finished(user) => println!("{:?}", user),
//!     CallOutcome::Failed(error) => eprintln!("{}", error),
//!     CallOutcome::Abandoned => {}
//! }
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod managers;
pub mod ports;
pub mod recovery;
pub mod service;

#[cfg(test)]
mod testing;

// Re-exports for public API
pub use adapters::{ReqwestTransport, TracingIndicator};
pub use domain::classify::{Classification, ErrorClassifier, RECOVERY_THRESHOLD};
pub use domain::config::{ClientConfig, ConfigError, HttpConfig, RecoveryConfig};
pub use domain::correlation::CorrelationToken;
pub use domain::error::{ErrorEnvelope, ErrorKind, PayloadError};
pub use domain::payload::{Payload, PayloadValue};
pub use domain::pending::{PendingRequest, PendingRequestTracker};
pub use domain::response::{unwrap_response, ParsedResponse, UnwrapError};
pub use managers::{PendingRequestStatus, UtilsManager};
pub use ports::inbound::{JsonEvents, NoopEvents};
pub use ports::outbound::{HttpResponse, HttpTransport, ProcessingIndicator, TimeSource, TransportError};
pub use recovery::{
    CancelHandle, PollOutcome, PollState, PollingScheduler, RecoveryCoordinator, RecoveryGuard,
};
pub use service::{encode_uri, CallHandle, CallOutcome, ClientFactory, RequestClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `User-Agent` sent by the reqwest transport
pub fn user_agent() -> String {
    format!("perun-rpc-client/{}", VERSION)
}
