//! Correlation token for matching a call with its server-side pending request.
//!
//! The token is the call's start time in milliseconds since the Unix epoch.
//! It travels as `?callback=<token>` and the server may use it to frame its
//! response as `<token>(<value>);`. Tokens handed out by one
//! [`TokenGenerator`] are strictly increasing, so two calls started within
//! the same millisecond still get distinct tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback name assumed when no token was sent with the call
pub const NO_CALLBACK: &str = "null";

/// Correlation token of one logical call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Token for a start time in milliseconds since the Unix epoch
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.to_string())
    }

    /// Wrap a token received from elsewhere (e.g. a server record)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Token as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Start time encoded in the token, if it is numeric
    pub fn timestamp_ms(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CorrelationToken {
    fn from(millis: u64) -> Self {
        Self::from_millis(millis)
    }
}

impl AsRef<str> for CorrelationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out strictly increasing timestamp tokens.
#[derive(Debug, Default)]
pub struct TokenGenerator {
    last: AtomicU64,
}

impl TokenGenerator {
    /// Create a generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next token for a call starting at `now_ms`.
    ///
    /// Returns `now_ms` unless an equal or later token was already issued,
    /// in which case the previous token plus one is used.
    pub fn next(&self, now_ms: u64) -> CorrelationToken {
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(previous.saturating_add(1));
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return CorrelationToken::from_millis(candidate),
                Err(actual) => previous = actual,
            }
        }
    }
}
