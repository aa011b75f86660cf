//! Ports of the RPC client.
//!
//! `inbound` is what callers implement to receive results, `outbound` is
//! what the client needs from its environment (HTTP, clock, indicator).

pub mod inbound;
pub mod outbound;

pub use inbound::{JsonEvents, NoopEvents};
pub use outbound::{HttpResponse, HttpTransport, ProcessingIndicator, SystemTimeSource, TimeSource, TransportError};
