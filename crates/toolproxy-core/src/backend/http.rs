//! HTTP backend client (reqwest)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::error::{BackendError, BackendResult};
use super::traits::{Backend, BackendResponse};
use crate::config::BackendSettings;
use crate::logging::Logger;
use crate::types::ChatCompletionRequest;

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint
///
/// Every call carries its own deadline. Transient failures (connect errors,
/// timeouts, 5xx) are retried up to `max_retries` times with a linearly
/// growing delay; the request body is safe to resend.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    logger: Arc<dyn Logger>,
}

impl HttpBackend {
    /// Create a client for `url` with a per-call timeout and no retries
    pub fn new(url: impl Into<String>, timeout: Duration, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        Self::build(url.into(), timeout, true, logger)
    }

    pub fn from_settings(settings: &BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        Ok(
            Self::build(settings.url.clone(), settings.timeout(), settings.use_env_proxy, logger)?
                .with_retries(settings.max_retries, settings.retry_backoff()),
        )
    }

    fn build(url: String, timeout: Duration, use_env_proxy: bool, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if !use_env_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            url,
            timeout,
            max_retries: 0,
            retry_backoff: Duration::from_millis(250),
            logger,
        })
    }

    /// Set the retry budget
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delay before retry `attempt` (1-based), saturating at `Duration::MAX`
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> BackendResult<BackendResponse> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let reply = BackendResponse::new(status, body);

        if reply.is_success() {
            Ok(reply)
        } else {
            Err(BackendError::status(
                status,
                String::from_utf8_lossy(&reply.body).into_owned(),
            ))
        }
    }

    fn classify(&self, error: reqwest::Error) -> BackendError {
        if error.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Http(error)
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn chat_completion(&self, request: &ChatCompletionRequest) -> BackendResult<BackendResponse> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay(attempt);
                    self.logger.warn(&format!(
                        "[HttpBackend] Attempt {} to {} failed: {}; retrying in {:?}",
                        attempt, self.url, e, delay
                    ));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.logger.error(&format!("[HttpBackend] Request to {} failed: {}", self.url, e));
                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
