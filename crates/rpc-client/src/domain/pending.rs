//! Pending Request Tracker - calls that may have to be recovered by polling.
//!
//! Maps correlation tokens to the metadata of calls made with recovery
//! enabled. An entry is registered before the request is sent and removed
//! exactly once, by whichever path resolves the call first.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::correlation::{CorrelationToken, TokenGenerator};
use crate::ports::outbound::{SystemTimeSource, TimeSource};

/// A call registered for recovery
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Correlation token of the call
    pub token: CorrelationToken,
    /// When the call was dispatched
    pub started_at: Instant,
    /// When the result became available
    pub ended_at: Option<Instant>,
    /// Result carried by the resolution, if any
    pub result: Option<Value>,
}

impl PendingRequest {
    /// Time between dispatch and resolution, or until now if still pending
    pub fn elapsed(&self) -> Duration {
        self.ended_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }

    /// True once a resolution was recorded
    pub fn is_resolved(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Statistics for the tracker
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls resolved with a result
    pub total_resolved: AtomicU64,
    /// Total entries dropped without a result (errors, cancellation)
    pub total_removed: AtomicU64,
}

/// Token-keyed registry of calls made with recovery enabled.
///
/// Flow:
/// 1. Client takes a token from `next_token()`
/// 2. Client calls `register()` before sending the request
/// 3. On HTTP 500 the classifier asks `elapsed()` for the token
/// 4. The winning resolution path calls `resolve()` or `remove()`
pub struct PendingRequestTracker {
    /// Map of correlation token to pending request
    pending: DashMap<CorrelationToken, PendingRequest>,
    /// Token source
    tokens: TokenGenerator,
    /// Wall clock for token values
    time_source: Arc<dyn TimeSource>,
    /// Statistics
    stats: PendingStats,
}

impl PendingRequestTracker {
    /// Create a tracker using the system clock for tokens
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource))
    }

    /// Create a tracker with a custom clock for tokens
    pub fn with_time_source(time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            pending: DashMap::new(),
            tokens: TokenGenerator::new(),
            time_source,
            stats: PendingStats::default(),
        }
    }

    /// Token for a call starting now
    pub fn next_token(&self) -> CorrelationToken {
        self.tokens.next(self.time_source.now_millis())
    }

    /// Register a call dispatched now.
    ///
    /// Returns false if the token is already registered; the existing entry
    /// is kept.
    pub fn register(&self, token: &CorrelationToken) -> bool {
        self.register_at(token, Instant::now())
    }

    /// Register a call dispatched at `started_at`.
    pub fn register_at(&self, token: &CorrelationToken, started_at: Instant) -> bool {
        let request = PendingRequest {
            token: token.clone(),
            started_at,
            ended_at: None,
            result: None,
        };

        match self.pending.entry(token.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!(token = %token, "Token already registered");
                false
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(request);
                self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                debug!(token = %token, "Registered pending request");
                true
            }
        }
    }

    /// Time since the call registered under `token` was dispatched
    pub fn elapsed(&self, token: &CorrelationToken) -> Option<Duration> {
        self.pending.get(token).map(|request| request.elapsed())
    }

    /// Snapshot of the entry for `token`
    pub fn get(&self, token: &CorrelationToken) -> Option<PendingRequest> {
        self.pending.get(token).map(|request| request.clone())
    }

    /// Record the result of a call and drop its entry.
    ///
    /// Returns the resolved request, or None if the token was not (or no
    /// longer) registered.
    pub fn resolve(&self, token: &CorrelationToken, result: Option<Value>) -> Option<PendingRequest> {
        let Some((_, mut request)) = self.pending.remove(token) else {
            warn!(token = %token, "Resolution for unknown or already resolved token");
            return None;
        };

        request.ended_at = Some(Instant::now());
        request.result = result;
        self.stats.total_resolved.fetch_add(1, Ordering::Relaxed);

        debug!(
            token = %token,
            elapsed_ms = request.elapsed().as_millis() as u64,
            "Resolved pending request"
        );

        Some(request)
    }

    /// Drop the entry for `token` without a result
    pub fn remove(&self, token: &CorrelationToken) -> Option<PendingRequest> {
        let (_, request) = self.pending.remove(token)?;
        self.stats.total_removed.fetch_add(1, Ordering::Relaxed);
        debug!(token = %token, "Removed pending request");
        Some(request)
    }

    /// Check if a token is pending
    pub fn is_pending(&self, token: &CorrelationToken) -> bool {
        self.pending.contains_key(token)
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingRequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
