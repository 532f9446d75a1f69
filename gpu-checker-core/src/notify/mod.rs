//! Webhook notification
//!
//! Composes the cluster status message and delivers it to a webhook with
//! bounded, fixed-delay retry.

mod delivery;
mod message;
mod mock;
mod transport;

pub use delivery::*;
pub use message::{compose, should_notify};
pub use mock::MockTransport;
pub use transport::{HttpTransport, TransportError, WebhookPayload, WebhookResponse, WebhookTransport};
