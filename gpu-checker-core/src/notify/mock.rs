//! Scripted webhook transport for testing

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::transport::{TransportError, WebhookPayload, WebhookResponse, WebhookTransport};

/// Transport that replays a fixed sequence of results
///
/// Once the script runs out, every further call fails with
/// [`TransportError::Other`].
pub struct MockTransport {
    script: Mutex<VecDeque<Result<WebhookResponse, TransportError>>>,
    requests: Mutex<Vec<(String, WebhookPayload)>>,
    calls: AtomicU32,
}

impl MockTransport {
    /// Create a mock with the given results, returned in order
    pub fn new(script: Vec<Result<WebhookResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Mock that answers every call with HTTP 200
    pub fn always_ok(times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|_| Ok(WebhookResponse::new(200, "ok")))
                .collect(),
        )
    }

    /// Number of POSTs made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Endpoints and payloads received, in order
    pub async fn requests(&self) -> Vec<(String, WebhookPayload)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl WebhookTransport for MockTransport {
    async fn post(
        &self,
        endpoint: &str,
        payload: &WebhookPayload,
    ) -> Result<WebhookResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .await
            .push((endpoint.to_string(), payload.clone()));

        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted response".to_string())))
    }
}
