//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::config::ClientConfig;
use crate::domain::error::ErrorEnvelope;
use crate::ports::inbound::JsonEvents;
use crate::ports::outbound::{HttpResponse, HttpTransport, TransportError};
use crate::service::ClientFactory;

pub(crate) const TEST_RPC_URL: &str = "http://rpc.test/json/";

type Responder = Arc<dyn Fn(&str, &str) -> HttpResponse + Send + Sync>;

#[derive(Clone)]
enum Answer {
    Fixed(Result<HttpResponse, TransportError>),
    Computed(Responder),
}

#[derive(Clone)]
struct Reply {
    delay: Duration,
    answer: Answer,
}

struct Route {
    fragment: String,
    replies: VecDeque<Reply>,
}

/// Transport answering from per-path scripts.
///
/// Each route replays its replies in order and keeps repeating the last
/// one. Unknown URLs get a 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, fragment: &str, response: HttpResponse) {
        self.push(fragment, Duration::ZERO, Answer::Fixed(Ok(response)));
    }

    pub(crate) fn reply_after(&self, fragment: &str, delay: Duration, response: HttpResponse) {
        self.push(fragment, delay, Answer::Fixed(Ok(response)));
    }

    pub(crate) fn reply_sequence(&self, fragment: &str, responses: Vec<HttpResponse>) {
        for response in responses {
            self.reply(fragment, response);
        }
    }

    pub(crate) fn fail(&self, fragment: &str, error: TransportError) {
        self.push(fragment, Duration::ZERO, Answer::Fixed(Err(error)));
    }

    /// Answer computed from `(url, body)`
    pub(crate) fn respond_with<F>(&self, fragment: &str, responder: F)
    where
        F: Fn(&str, &str) -> HttpResponse + Send + Sync + 'static,
    {
        self.push(fragment, Duration::ZERO, Answer::Computed(Arc::new(responder)));
    }

    pub(crate) fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }

    pub(crate) fn requests_to(&self, fragment: &str) -> Vec<(String, String)> {
        self.requests
            .lock()
            .iter()
            .filter(|(url, _)| url.contains(fragment))
            .cloned()
            .collect()
    }

    fn push(&self, fragment: &str, delay: Duration, answer: Answer) {
        let mut routes = self.routes.lock();
        let reply = Reply { delay, answer };
        match routes.iter_mut().find(|route| route.fragment == fragment) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                fragment: fragment.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock();
        let route = routes.iter_mut().find(|route| url.contains(&route.fragment))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push((url.to_string(), body.clone()));

        let Some(reply) = self.next_reply(url) else {
            return Ok(HttpResponse::new(404, "Not Found", ""));
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.answer {
            Answer::Fixed(result) => result,
            Answer::Computed(responder) => Ok(responder(url, &body)),
        }
    }
}

/// Pending request record for whatever token the query asks about
pub(crate) fn finished_record(end_time: u64, result: Value) -> impl Fn(&str, &str) -> HttpResponse {
    move |_, body| {
        let query: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let record = json!({
            "callbackName": query["callbackName"],
            "startTime": 1,
            "endTime": end_time,
            "result": result,
        });
        HttpResponse::ok(record.to_string())
    }
}

/// Event observed by [`RecordingEvents`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    LoadingStart,
    Finished(Option<Value>),
    Error(ErrorEnvelope),
}

#[derive(Default)]
pub(crate) struct RecordingEvents {
    events: Mutex<Vec<Event>>,
}

impl RecordingEvents {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Number of finished/error notifications
    pub(crate) fn deliveries(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| !matches!(event, Event::LoadingStart))
            .count()
    }
}

impl JsonEvents for RecordingEvents {
    fn on_loading_start(&self) {
        self.events.lock().push(Event::LoadingStart);
    }

    fn on_finished(&self, value: Option<&Value>) {
        self.events.lock().push(Event::Finished(value.cloned()));
    }

    fn on_error(&self, error: &ErrorEnvelope) {
        self.events.lock().push(Event::Error(error.clone()));
    }
}

pub(crate) fn factory_with(transport: Arc<ScriptedTransport>) -> ClientFactory {
    ClientFactory::new(ClientConfig::with_rpc_url(TEST_RPC_URL), transport)
        .expect("test config is valid")
}
