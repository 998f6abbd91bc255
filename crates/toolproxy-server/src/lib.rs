//! HTTP surface for the tool proxy
//!
//! A thin layer: requests are decoded into core types, handed to the
//! `Orchestrator`, and core outcomes are rendered back as HTTP.

pub mod error;
pub mod handlers;
pub mod state;
pub mod telemetry;

use axum::routing::{get, post};
use axum::Router;

pub use error::{ApiError, ServerError, ServerResult};
pub use state::AppState;

/// Build the proxy router over prepared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/health", get(handlers::health))
        .with_state(state)
}
