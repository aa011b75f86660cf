//! Shared fixtures: a scriptable RPC server and an event recorder.

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use perun_rpc_client::{ErrorEnvelope, JsonEvents};

/// Path prefix the mock server serves the API under
pub const RPC_PREFIX: &str = "/krb/rpc/json/";

/// One request as seen by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method path below the prefix, still percent-encoded
    pub path: String,
    /// Raw query string
    pub query: Option<String>,
    /// Request body
    pub body: String,
}

impl RecordedRequest {
    /// Value of the `callback` query parameter
    pub fn callback(&self) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("callback="))
    }

    /// Body parsed as JSON, `Null` when empty or invalid
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync>;

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<String, Handler>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process HTTP server answering per method path.
///
/// Unknown paths get a 404.
pub struct MockRpcServer {
    base_url: String,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockRpcServer {
    /// Bind to an ephemeral local port and start serving
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{}{}", addr, RPC_PREFIX),
            state,
            task,
        }
    }

    /// URL prefix to configure the client with
    pub fn rpc_url(&self) -> &str {
        &self.base_url
    }

    /// Answer requests to `path` with `handler`
    pub fn route<F>(&self, path: &str, handler: F)
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        self.state
            .routes
            .lock()
            .insert(path.to_string(), Arc::new(handler));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Requests received for `path`
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for MockRpcServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, body: String) -> (StatusCode, String) {
    let path = uri
        .path()
        .strip_prefix(RPC_PREFIX)
        .unwrap_or(uri.path())
        .to_string();
    let request = RecordedRequest {
        path,
        query: uri.query().map(str::to_string),
        body,
    };
    state.requests.lock().push(request.clone());

    let handler = state.routes.lock().get(&request.path).cloned();
    let (status, body) = match handler {
        Some(handler) => handler(&request),
        None => (404, String::new()),
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body)
}

/// Notification seen by [`RecordingEvents`]
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    LoadingStart,
    Finished(Option<Value>),
    Error(ErrorEnvelope),
}

/// Event sink keeping every notification
#[derive(Default)]
pub struct RecordingEvents {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingEvents {
    /// Notifications in arrival order
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }
}

impl JsonEvents for RecordingEvents {
    fn on_loading_start(&self) {
        self.seen.lock().push(Notification::LoadingStart);
    }

    fn on_finished(&self, value: Option<&Value>) {
        self.seen.lock().push(Notification::Finished(value.cloned()));
    }

    fn on_error(&self, error: &ErrorEnvelope) {
        self.seen.lock().push(Notification::Error(error.clone()));
    }
}
