//! Route handlers

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use toolproxy_core::{CancellationToken, ChatCompletionRequest, ProxyResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /v1/chat/completions`
///
/// The orchestration runs on its own task. If the client disconnects, this
/// future is dropped and the drop guard cancels the task's token.
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let identity = state.identity(&headers);
    let cancel = CancellationToken::new();
    let guard = cancel.drop_guard();

    let orchestrator = state.orchestrator().clone();
    let task = tokio::spawn(async move { orchestrator.run(request, &identity, &cancel).await });

    let outcome = task.await;
    guard.disarm();

    match outcome {
        Ok(Ok(reply)) => relay(reply),
        Ok(Err(error)) => ApiError::from(error).into_response(),
        Err(join_error) => {
            tracing::error!(error = %join_error, "orchestration task failed");
            ApiError::Internal("request processing failed".to_string()).into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Return the backend's final reply unchanged
fn relay(reply: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    (status, [(CONTENT_TYPE, "application/json")], reply.body).into_response()
}
