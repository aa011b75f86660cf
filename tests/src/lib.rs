//! # Perun RPC Test Suite
//!
//! Runs the client with its real reqwest transport against an in-process
//! axum server standing in for the Perun RPC endpoint.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Mock RPC server and recording event sink
//! └── integration/
//!     ├── http_roundtrip.rs   # Payloads, wrapping, status codes
//!     └── recovery.rs         # Proxy timeout recovery by polling
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p perun-rpc-tests
//! cargo test -p perun-rpc-tests integration::recovery::
//! ```

pub mod support;
