//! Webhook delivery with bounded retry
//!
//! Each delivery makes at most `max_retries + 1` attempts:
//! - HTTP 200: delivered, stop
//! - any other status: rejected, stop without retrying
//! - connection reset / aborted: wait `retry_delay`, try again if attempts remain
//! - any other transport error: failed, stop without retrying
//!
//! Delivery never returns an error; failures are logged and reported.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::transport::{TransportError, WebhookPayload, WebhookResponse, WebhookTransport};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait between retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Wait before each retry
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// How the sender presents itself in the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookIdentity {
    pub username: String,
    pub icon_emoji: String,
}

impl Default for WebhookIdentity {
    fn default() -> Self {
        Self {
            username: "k8s-gpu-checker".to_string(),
            icon_emoji: ":robot_face:".to_string(),
        }
    }
}

/// Where a single attempt leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Webhook accepted the message
    Delivered,
    /// Attempt failed but another one is allowed
    Retryable(TransportError),
    /// No further attempts
    Fatal(DeliveryOutcome),
}

/// Final result of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted with HTTP 200
    Delivered,
    /// No endpoint configured, nothing sent
    Skipped,
    /// Webhook answered with a non-200 status
    Rejected { status: u16, body: String },
    /// Transport error that is never retried
    Failed(TransportError),
    /// Retryable errors on every allowed attempt
    RetriesExhausted(TransportError),
}

/// Outcome plus attempt accounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    /// POSTs made
    pub attempts: u32,
    /// Delays waited between attempts
    pub retries: u32,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.outcome == DeliveryOutcome::Delivered
    }
}

/// Decide the next state after attempt number `attempt` (0-based)
pub fn next_state(
    attempt: u32,
    max_retries: u32,
    result: Result<WebhookResponse, TransportError>,
) -> AttemptState {
    match result {
        Ok(response) if response.status == 200 => AttemptState::Delivered,
        Ok(response) => AttemptState::Fatal(DeliveryOutcome::Rejected {
            status: response.status,
            body: response.body,
        }),
        Err(err) if err.is_retryable() && attempt < max_retries => AttemptState::Retryable(err),
        Err(err) if err.is_retryable() => AttemptState::Fatal(DeliveryOutcome::RetriesExhausted(err)),
        Err(err) => AttemptState::Fatal(DeliveryOutcome::Failed(err)),
    }
}

/// Sends messages to a webhook through a transport
pub struct WebhookNotifier<T: WebhookTransport> {
    transport: T,
    identity: WebhookIdentity,
    policy: RetryPolicy,
}

impl<T: WebhookTransport> WebhookNotifier<T> {
    /// Create a notifier
    pub fn new(transport: T, identity: WebhookIdentity, policy: RetryPolicy) -> Self {
        Self {
            transport,
            identity,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Deliver `text`, returning whether the webhook accepted it
    pub async fn deliver(&self, endpoint: Option<&str>, text: &str) -> bool {
        self.deliver_with_report(endpoint, text).await.is_delivered()
    }

    /// Deliver `text` and report how it went
    pub async fn deliver_with_report(&self, endpoint: Option<&str>, text: &str) -> DeliveryReport {
        let endpoint = match endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => {
                return DeliveryReport {
                    outcome: DeliveryOutcome::Skipped,
                    attempts: 0,
                    retries: 0,
                }
            }
        };

        let payload = WebhookPayload {
            text: text.to_string(),
            username: self.identity.username.clone(),
            icon_emoji: self.identity.icon_emoji.clone(),
        };
        let total_attempts = self.policy.max_retries + 1;

        let mut attempt = 0;
        loop {
            let result = self.transport.post(endpoint, &payload).await;

            match next_state(attempt, self.policy.max_retries, result) {
                AttemptState::Delivered => {
                    if attempt > 0 {
                        info!(
                            attempt = attempt + 1,
                            total = total_attempts,
                            "Webhook message delivered after retry"
                        );
                    }
                    return DeliveryReport {
                        outcome: DeliveryOutcome::Delivered,
                        attempts: attempt + 1,
                        retries: attempt,
                    };
                }
                AttemptState::Retryable(err) => {
                    warn!(
                        attempt = attempt + 1,
                        total = total_attempts,
                        delay = ?self.policy.retry_delay,
                        error = %err,
                        "Webhook delivery failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    attempt += 1;
                }
                AttemptState::Fatal(outcome) => {
                    match &outcome {
                        DeliveryOutcome::Rejected { status, body } => {
                            error!(status = *status, body = %body, "Webhook rejected message");
                        }
                        DeliveryOutcome::RetriesExhausted(err) => {
                            error!(
                                attempts = attempt + 1,
                                error = %err,
                                "Webhook delivery failed after all retries"
                            );
                        }
                        DeliveryOutcome::Failed(err) => {
                            error!(error = %err, "Webhook delivery failed");
                        }
                        DeliveryOutcome::Delivered | DeliveryOutcome::Skipped => {}
                    }
                    return DeliveryReport {
                        outcome,
                        attempts: attempt + 1,
                        retries: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockTransport;
    use tokio::time::Instant;

    const ENDPOINT: &str = "https://hooks.example.com/services/T000/B000/XXXX";

    fn reset() -> Result<WebhookResponse, TransportError> {
        Err(TransportError::ConnectionReset("os error 104".to_string()))
    }

    fn ok() -> Result<WebhookResponse, TransportError> {
        Ok(WebhookResponse::new(200, "ok"))
    }

    fn notifier(script: Vec<Result<WebhookResponse, TransportError>>, max_retries: u32) -> WebhookNotifier<MockTransport> {
        WebhookNotifier::new(
            MockTransport::new(script),
            WebhookIdentity::default(),
            RetryPolicy {
                max_retries,
                retry_delay: Duration::from_secs(1),
            },
        )
    }

    #[test]
    fn test_next_state() {
        assert_eq!(next_state(0, 3, ok()), AttemptState::Delivered);
        assert!(matches!(
            next_state(0, 3, Ok(WebhookResponse::new(201, ""))),
            AttemptState::Fatal(DeliveryOutcome::Rejected { status: 201, .. })
        ));
        assert!(matches!(next_state(2, 3, reset()), AttemptState::Retryable(_)));
        assert!(matches!(
            next_state(3, 3, reset()),
            AttemptState::Fatal(DeliveryOutcome::RetriesExhausted(_))
        ));
        assert!(matches!(
            next_state(0, 3, Err(TransportError::Timeout("t".into()))),
            AttemptState::Fatal(DeliveryOutcome::Failed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_delivered() {
        let notifier = notifier(vec![reset(), reset(), ok()], 2);

        let start = Instant::now();
        let report = notifier.deliver_with_report(Some(ENDPOINT), "msg").await;

        assert!(report.is_delivered());
        assert_eq!(report.attempts, 3);
        assert_eq!(report.retries, 2);
        assert_eq!(notifier.transport().calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_not_retried() {
        let notifier = notifier(vec![Ok(WebhookResponse::new(500, "boom")), ok()], 3);

        let start = Instant::now();
        let report = notifier.deliver_with_report(Some(ENDPOINT), "msg").await;

        assert!(!report.is_delivered());
        assert_eq!(
            report.outcome,
            DeliveryOutcome::Rejected {
                status: 500,
                body: "boom".to_string()
            }
        );
        assert_eq!(report.retries, 0);
        assert_eq!(notifier.transport().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    // Only reset/aborted connections are retried; refused connections and
    // timeouts fail on the first attempt.
    #[tokio::test(start_paused = true)]
    async fn test_non_reset_transport_errors_not_retried() {
        for err in [
            TransportError::Timeout("timed out".into()),
            TransportError::Connect("connection refused".into()),
            TransportError::Other("builder".into()),
        ] {
            let notifier = notifier(vec![Err(err.clone()), ok()], 3);
            let report = notifier.deliver_with_report(Some(ENDPOINT), "msg").await;

            assert_eq!(report.outcome, DeliveryOutcome::Failed(err));
            assert_eq!(report.attempts, 1);
            assert_eq!(notifier.transport().calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_connection_is_retried() {
        let notifier = notifier(
            vec![Err(TransportError::ConnectionAborted("aborted".into())), ok()],
            1,
        );
        assert!(notifier.deliver(Some(ENDPOINT), "msg").await);
        assert_eq!(notifier.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let notifier = notifier(vec![reset(), reset(), reset(), ok()], 2);

        let start = Instant::now();
        let report = notifier.deliver_with_report(Some(ENDPOINT), "msg").await;

        assert!(matches!(report.outcome, DeliveryOutcome::RetriesExhausted(_)));
        assert_eq!(report.attempts, 3);
        assert_eq!(report.retries, 2);
        assert_eq!(notifier.transport().calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let notifier = notifier(vec![reset(), ok()], 0);
        let report = notifier.deliver_with_report(Some(ENDPOINT), "msg").await;

        assert!(matches!(report.outcome, DeliveryOutcome::RetriesExhausted(_)));
        assert_eq!(notifier.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_noop() {
        for endpoint in [None, Some("")] {
            let notifier = notifier(vec![ok()], 3);
            let report = notifier.deliver_with_report(endpoint, "msg").await;

            assert_eq!(report.outcome, DeliveryOutcome::Skipped);
            assert_eq!(report.attempts, 0);
            assert!(!notifier.deliver(endpoint, "msg").await);
            assert_eq!(notifier.transport().calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_payload_carries_identity() {
        let notifier = WebhookNotifier::new(
            MockTransport::always_ok(1),
            WebhookIdentity {
                username: "gpu-bot".to_string(),
                icon_emoji: ":robot_face:".to_string(),
            },
            RetryPolicy::default(),
        );
        assert!(notifier.deliver(Some(ENDPOINT), "status").await);

        let requests = notifier.transport().requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, ENDPOINT);
        assert_eq!(
            requests[0].1,
            WebhookPayload {
                text: "status".to_string(),
                username: "gpu-bot".to_string(),
                icon_emoji: ":robot_face:".to_string(),
            }
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay, Duration::from_secs(30));
    }
}
