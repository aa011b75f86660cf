//! # Perun RPC Telemetry
//!
//! Log subscriber setup shared by the Perun RPC tools. Library crates only
//! emit `tracing` events; binaries call [`init_tracing`] once at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use perun_rpc_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     init_tracing(&TelemetryConfig::from_env()).expect("Failed to init tracing");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PERUN_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` as fallback) |
//! | `PERUN_JSON_LOGS` | `false` | JSON formatted output |
//! | `PERUN_CONSOLE_OUTPUT` | `true` | Write logs to stderr |
//! | `PERUN_SERVICE_NAME` | `perun-rpc` | Service name in the startup event |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
