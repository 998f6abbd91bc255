//! Server errors and HTTP error rendering

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use toolproxy_core::tools::RegistryError;
use toolproxy_core::{BackendError, ConfigError, ProxyError};

/// Errors that stop the server from starting or running
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to build tool registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid bind address {addr:?}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Telemetry(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body for every error the proxy answers with
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<&'a str>,
}

/// Request failure as seen by the client
#[derive(Debug)]
pub enum ApiError {
    Proxy(ProxyError),
    /// The orchestration task ended without an outcome
    Internal(String),
}

impl From<ProxyError> for ApiError {
    fn from(error: ProxyError) -> Self {
        ApiError::Proxy(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Proxy(error) => {
                let status = StatusCode::from_u16(error.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = ErrorBody {
                    error: match error {
                        ProxyError::UserPolicyViolation { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    },
                    code: error.code(),
                    tool: error.tool(),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Internal(message) => {
                let body = ErrorBody {
                    error: message.clone(),
                    code: "internal_error",
                    tool: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
