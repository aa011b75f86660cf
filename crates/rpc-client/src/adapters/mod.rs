//! Adapters binding the outbound ports to real infrastructure.

pub mod http;
pub mod indicator;

pub use http::ReqwestTransport;
pub use indicator::TracingIndicator;
