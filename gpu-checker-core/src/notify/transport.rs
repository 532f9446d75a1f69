//! Webhook transport
//!
//! A transport performs exactly one POST of a [`WebhookPayload`] and reports
//! either the HTTP status or a classified [`TransportError`]. Retry decisions
//! live in the delivery engine, not here.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
}

/// HTTP response as seen by the delivery engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport-level failures, before any HTTP status is received
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Peer reset the connection
    #[error("Connection reset by peer: {0}")]
    ConnectionReset(String),

    /// Connection aborted mid-request
    #[error("Connection aborted: {0}")]
    ConnectionAborted(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Could not establish a connection
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other request failure
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Only reset and aborted connections are retried.
    ///
    /// Timeouts and refused connections are treated as permanent for this
    /// invocation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionReset(_) | TransportError::ConnectionAborted(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);

        // io errors carry the precise kind; fall back to the message text
        // for stacks that only surface a string.
        if let Some(kind) = io_error_kind(&err) {
            match kind {
                io::ErrorKind::ConnectionReset => return TransportError::ConnectionReset(message),
                io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
                    return TransportError::ConnectionAborted(message)
                }
                _ => {}
            }
        }
        // Peer closed the connection without sending a response.
        if is_incomplete_message(&err) {
            return TransportError::ConnectionAborted(message);
        }
        if message.contains("Connection reset by peer") {
            return TransportError::ConnectionReset(message);
        }
        if message.contains("Connection aborted")
            || message.contains("connection closed before message completed")
        {
            return TransportError::ConnectionAborted(message);
        }

        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else {
            TransportError::Other(message)
        }
    }
}

/// First `io::ErrorKind` found in an error's source chain
fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = current.source();
    }
    None
}

/// Whether a hyper "connection closed before message completed" error is in the chain
fn is_incomplete_message(err: &(dyn StdError + 'static)) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(hyper_err) = current.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        source = current.source();
    }
    false
}

/// Join an error and all its sources into one line
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(current) = source {
        parts.push(current.to_string());
        source = current.source();
    }
    parts.join(": ")
}

/// Sends one webhook request
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST `payload` to `endpoint` once
    async fn post(
        &self,
        endpoint: &str,
        payload: &WebhookPayload,
    ) -> Result<WebhookResponse, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(
        &self,
        endpoint: &str,
        payload: &WebhookPayload,
    ) -> Result<WebhookResponse, TransportError> {
        let response = self.client.post(endpoint).json(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(WebhookResponse { status, body })
    }
}
