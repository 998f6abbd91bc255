//! Stub chat-completion backend
//!
//! Serves scripted replies in order on `127.0.0.1:<ephemeral>` and records
//! every request body it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One scripted reply
#[derive(Debug, Clone)]
pub struct StubReply {
    pub status: u16,
    pub body: Value,
}

impl StubReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

#[derive(Clone)]
struct StubState {
    script: Arc<Mutex<VecDeque<StubReply>>>,
    fallback: Option<StubReply>,
    delay: Duration,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Handle for a running stub; shuts the server down on drop
pub struct BackendStubHandle {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl BackendStubHandle {
    /// Full chat-completions URL of the stub
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

impl Drop for BackendStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// Builder for a stub backend
#[derive(Default)]
pub struct BackendStub {
    script: VecDeque<StubReply>,
    fallback: Option<StubReply>,
    delay: Duration,
}

impl BackendStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 reply
    pub fn reply(mut self, body: Value) -> Self {
        self.script.push_back(StubReply::ok(body));
        self
    }

    pub fn then(mut self, reply: StubReply) -> Self {
        self.script.push_back(reply);
        self
    }

    /// Reply used once the script is exhausted
    pub fn repeat(mut self, body: Value) -> Self {
        self.fallback = Some(StubReply::ok(body));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn spawn(self) -> BackendStubHandle {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            script: Arc::new(Mutex::new(self.script)),
            fallback: self.fallback,
            delay: self.delay,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(handle_completion))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        BackendStubHandle {
            url: format!("http://{}/v1/chat/completions", addr),
            shutdown: Some(shutdown_tx),
            join: Some(join),
            requests,
        }
    }
}

async fn handle_completion(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(body);
    }
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let next = state
        .script
        .lock()
        .ok()
        .and_then(|mut script| script.pop_front())
        .or_else(|| state.fallback.clone());

    match next {
        Some(reply) => {
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
            (status, Json(reply.body)).into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "stub backend has no scripted reply" })),
        )
            .into_response(),
    }
}
