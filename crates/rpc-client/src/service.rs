//! Request Client - the call lifecycle.
//!
//! ## Flow
//!
//! 1. Take a correlation token; register it when recovery is enabled
//! 2. Build `rpc_url + path [?callback=token]`, encoded like `encodeURI`
//! 3. Fire `on_loading_start`, POST the serialized payload
//! 4. 200: unwrap the body into a value or an application error
//! 5. Other status: classify; a recoverable timeout hands over to the
//!    [`PollingScheduler`] instead of failing
//! 6. Remove the pending request, then deliver exactly once

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::http::ReqwestTransport;
use crate::adapters::indicator::TracingIndicator;
use crate::domain::classify::{Classification, ErrorClassifier};
use crate::domain::config::{ClientConfig, ConfigError};
use crate::domain::correlation::CorrelationToken;
use crate::domain::error::{ErrorEnvelope, PayloadError};
use crate::domain::payload::{Payload, PayloadValue};
use crate::domain::pending::PendingRequestTracker;
use crate::domain::response::{interpret_value, unwrap_response, ParsedResponse};
use crate::managers::UtilsManager;
use crate::ports::inbound::{JsonEvents, NoopEvents};
use crate::ports::outbound::{HttpTransport, ProcessingIndicator, TransportError};
use crate::recovery::{CancelHandle, PollOutcome, PollingScheduler, RecoveryCoordinator};

/// Characters `encodeURI` leaves alone besides ASCII alphanumerics
const URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-encode a URL the way browsers' `encodeURI` does
pub fn encode_uri(url: &str) -> String {
    utf8_percent_encode(url, URI).to_string()
}

/// State shared by all clients of one factory
pub(crate) struct ClientContext {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) tracker: Arc<PendingRequestTracker>,
    pub(crate) coordinator: Arc<RecoveryCoordinator>,
    pub(crate) classifier: ErrorClassifier,
}

/// Creates clients sharing one transport, tracker and recovery coordinator.
#[derive(Clone)]
pub struct ClientFactory {
    context: Arc<ClientContext>,
}

impl ClientFactory {
    /// Factory over `transport`, reporting recovery through tracing
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ConfigError> {
        Self::with_indicator(config, transport, Arc::new(TracingIndicator))
    }

    /// Factory with a custom processing indicator
    pub fn with_indicator(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        indicator: Arc<dyn ProcessingIndicator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let classifier = ErrorClassifier::new(config.recovery.timeout_threshold);
        let context = ClientContext {
            config,
            transport,
            tracker: Arc::new(PendingRequestTracker::new()),
            coordinator: Arc::new(RecoveryCoordinator::with_indicator(indicator)),
            classifier,
        };

        Ok(Self {
            context: Arc::new(context),
        })
    }

    /// Factory using the reqwest transport configured by `config.http`
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::try_from_config(&config.http)
            .map_err(|e| ConfigError::Invalid(format!("http client: {}", e)))?;
        Self::new(config, Arc::new(transport))
    }

    /// Client for one call, without recovery
    pub fn client(&self) -> RequestClient {
        RequestClient::new(self.context.clone(), false)
    }

    /// Client for one call that survives proxy timeouts
    pub fn client_with_recovery(&self) -> RequestClient {
        RequestClient::new(self.context.clone(), true)
    }

    /// `utilsManager` facade
    pub fn utils(&self) -> UtilsManager {
        UtilsManager::new(self.context.clone())
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.context.config
    }

    /// Pending requests of recovery-enabled calls
    pub fn tracker(&self) -> &Arc<PendingRequestTracker> {
        &self.context.tracker
    }

    /// Count of calls being recovered
    pub fn coordinator(&self) -> &Arc<RecoveryCoordinator> {
        &self.context.coordinator
    }
}

/// Final result of one call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Success; `None` for an empty or `null` response
    Finished(Option<Value>),
    /// Terminal error, delivered to `on_error`
    Failed(ErrorEnvelope),
    /// Cancelled by the caller, nothing delivered
    Abandoned,
}

impl CallOutcome {
    /// True for `Finished`
    pub fn is_finished(&self) -> bool {
        matches!(self, CallOutcome::Finished(_))
    }

    /// Returned value, if finished with one
    pub fn value(&self) -> Option<&Value> {
        match self {
            CallOutcome::Finished(value) => value.as_ref(),
            _ => None,
        }
    }

    /// Delivered error, if failed
    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match self {
            CallOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Result of a single HTTP exchange
enum Exchange {
    Deliver(CallOutcome),
    Recover,
}

/// Immutable data of a dispatched call
struct PreparedCall {
    token: CorrelationToken,
    url: String,
    body: String,
}

/// Removes the pending request of a call whose future is dropped early
struct TrackedCall<'a> {
    tracker: &'a PendingRequestTracker,
    token: &'a CorrelationToken,
}

impl Drop for TrackedCall<'_> {
    fn drop(&mut self) {
        self.tracker.remove(self.token);
    }
}

/// One RPC call: collect parameters, then `call` or `dispatch`.
pub struct RequestClient {
    context: Arc<ClientContext>,
    payload: Payload,
    recovery: bool,
    events: Arc<dyn JsonEvents>,
    control: CancelHandle,
}

impl RequestClient {
    pub(crate) fn new(context: Arc<ClientContext>, recovery: bool) -> Self {
        Self {
            context,
            payload: Payload::new(),
            recovery,
            events: Arc::new(NoopEvents),
            control: CancelHandle::new(),
        }
    }

    /// Report progress to `events`
    pub fn with_events(mut self, events: Arc<dyn JsonEvents>) -> Self {
        self.events = events;
        self
    }

    /// Set a parameter
    pub fn put(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Result<&mut Self, PayloadError> {
        self.payload.put(name, value)?;
        Ok(self)
    }

    /// Set a structured parameter
    pub fn put_struct<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, PayloadError> {
        self.payload.put_struct(name, value)?;
        Ok(self)
    }

    /// Set an enum parameter by name
    pub fn put_enum<E: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &E,
    ) -> Result<&mut Self, PayloadError> {
        self.payload.put_enum(name, value)?;
        Ok(self)
    }

    /// Parameters collected so far
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether a proxy timeout is recovered by polling
    pub fn is_recovery_enabled(&self) -> bool {
        self.recovery
    }

    /// Handle that cancels this call
    pub fn cancel_handle(&self) -> CancelHandle {
        self.control.clone()
    }

    /// Perform the call and wait for its outcome.
    ///
    /// The outcome is also delivered to the event sink, except `Abandoned`.
    pub async fn call(self, path: &str) -> CallOutcome {
        let call = self.prepare(path);
        self.events.on_loading_start();
        self.run(call).await
    }

    /// Start the call on the tokio runtime.
    ///
    /// `on_loading_start` has fired by the time this returns.
    pub fn dispatch(self, path: &str) -> CallHandle {
        let call = self.prepare(path);
        self.events.on_loading_start();

        let token = call.token.clone();
        let cancel = self.control.clone();
        let join = tokio::spawn(async move { self.run(call).await });

        CallHandle {
            token,
            cancel,
            join,
        }
    }

    /// Single exchange without recovery, used for the pending request query
    pub(crate) async fn call_once(self, path: &str) -> CallOutcome {
        let call = self.prepare(path);
        self.events.on_loading_start();

        let outcome = match self.exchange(&call).await {
            Exchange::Deliver(outcome) => outcome,
            Exchange::Recover => self.failure(&call, ErrorClassifier::internal_error()),
        };
        self.finish(&call, outcome)
    }

    fn prepare(&self, path: &str) -> PreparedCall {
        let tracker = &self.context.tracker;
        let token = tracker.next_token();
        if self.recovery {
            tracker.register(&token);
        }

        let mut url = format!("{}{}", self.context.config.rpc_url, path);
        if self.recovery {
            url.push_str("?callback=");
            url.push_str(token.as_str());
        }

        PreparedCall {
            token,
            url: encode_uri(&url),
            body: self.payload.to_json(),
        }
    }

    async fn run(&self, call: PreparedCall) -> CallOutcome {
        let _tracked = self.recovery.then(|| TrackedCall {
            tracker: &self.context.tracker,
            token: &call.token,
        });

        let outcome = match self.exchange(&call).await {
            Exchange::Deliver(outcome) => outcome,
            Exchange::Recover => self.recover(&call).await,
        };
        self.finish(&call, outcome)
    }

    async fn exchange(&self, call: &PreparedCall) -> Exchange {
        debug!(
            token = %call.token,
            url = %call.url,
            recovery = self.recovery,
            "Dispatching call"
        );

        let classifier = &self.context.classifier;
        let response = match self.context.transport.post(&call.url, call.body.clone()).await {
            Ok(response) => response,
            Err(TransportError::NotSent(reason)) => {
                let error = classifier.transport_failure(Some(&reason));
                return Exchange::Deliver(self.failure(call, error));
            }
            Err(TransportError::Interrupted(reason)) => {
                debug!(token = %call.token, reason = %reason, "Exchange interrupted");
                return match classifier.classify_status(0, "", None) {
                    Classification::Terminal(error) => Exchange::Deliver(self.failure(call, error)),
                    Classification::RecoverableTimeout => Exchange::Recover,
                };
            }
        };

        if response.is_ok() {
            let callback = self.recovery.then_some(&call.token);
            let outcome = match unwrap_response(&response.body, callback) {
                Ok(parsed) => self.parsed_outcome(call, parsed),
                Err(e) => self.failure(call, classifier.malformed(&e)),
            };
            return Exchange::Deliver(outcome);
        }

        let elapsed = if self.recovery {
            self.context.tracker.elapsed(&call.token)
        } else {
            None
        };

        match classifier.classify_status(response.status, &response.status_text, elapsed) {
            Classification::RecoverableTimeout => {
                info!(
                    token = %call.token,
                    status = response.status,
                    elapsed_ms = elapsed.unwrap_or_default().as_millis() as u64,
                    "Server-side timeout, recovering call"
                );
                Exchange::Recover
            }
            Classification::Terminal(error) => Exchange::Deliver(self.failure(call, error)),
        }
    }

    async fn recover(&self, call: &PreparedCall) -> CallOutcome {
        let context = &self.context;
        let scheduler = PollingScheduler::new(
            context.config.recovery.poll_interval,
            context.coordinator.clone(),
            UtilsManager::new(context.clone()),
        );

        match scheduler.run(&call.token, &self.control).await {
            PollOutcome::Resolved(result) => {
                let elapsed = context
                    .tracker
                    .resolve(&call.token, result.clone())
                    .map(|request| request.elapsed())
                    .unwrap_or_default();
                info!(
                    token = %call.token,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Recovered call result"
                );
                match result {
                    Some(value) => self.parsed_outcome(call, interpret_value(value)),
                    None => CallOutcome::Finished(None),
                }
            }
            PollOutcome::Cancelled => CallOutcome::Abandoned,
        }
    }

    fn parsed_outcome(&self, call: &PreparedCall, parsed: ParsedResponse) -> CallOutcome {
        match parsed {
            ParsedResponse::Empty => CallOutcome::Finished(None),
            ParsedResponse::Value(value) => CallOutcome::Finished(Some(value)),
            ParsedResponse::Error(error) => self.failure(call, error),
        }
    }

    fn failure(&self, call: &PreparedCall, error: ErrorEnvelope) -> CallOutcome {
        CallOutcome::Failed(error.with_request(call.url.clone(), call.body.clone()))
    }

    /// Drop the pending request and deliver, unless the caller cancelled.
    fn finish(&self, call: &PreparedCall, outcome: CallOutcome) -> CallOutcome {
        if self.recovery {
            self.context.tracker.remove(&call.token);
        }

        // A recovered call already passed the gate inside the scheduler
        let cancelled = matches!(outcome, CallOutcome::Abandoned)
            || (!self.control.resolve() && self.control.is_cancelled());
        if cancelled {
            debug!(token = %call.token, "Call cancelled, outcome dropped");
            return CallOutcome::Abandoned;
        }

        match &outcome {
            CallOutcome::Finished(value) => {
                debug!(token = %call.token, empty = value.is_none(), "Call finished");
                self.events.on_finished(value.as_ref());
            }
            CallOutcome::Failed(error) => {
                debug!(
                    token = %call.token,
                    error_id = %error.error_id,
                    kind = %error.kind,
                    "Call failed"
                );
                self.events.on_error(error);
            }
            CallOutcome::Abandoned => {}
        }

        outcome
    }
}

/// Handle to a call started with [`RequestClient::dispatch`].
pub struct CallHandle {
    token: CorrelationToken,
    cancel: CancelHandle,
    join: JoinHandle<CallOutcome>,
}

impl CallHandle {
    /// Correlation token of the call
    pub fn token(&self) -> &CorrelationToken {
        &self.token
    }

    /// Cloneable cancellation handle
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the call; returns false if it already completed
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    /// Wait for the outcome
    pub async fn outcome(self) -> CallOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(token = %self.token, error = %e, "Call task did not complete");
                CallOutcome::Abandoned
            }
        }
    }
}
