//! GPU Checker Core Library
//!
//! Classifies Kubernetes nodes by GPU capacity and readiness, resolves an
//! overall cluster verdict, and delivers a status message to a webhook.

pub mod evaluation;
pub mod node;
pub mod notify;

// Re-export common types
pub use evaluation::{aggregate, evaluate, resolve, EvaluationResult, NodeSource, Verdict};
pub use node::{classify, GpuBreakdown, NodeSnapshot, TaintInfo, GPU_RESOURCE_KEYS};
pub use notify::{compose, should_notify, DeliveryReport, RetryPolicy, WebhookIdentity, WebhookNotifier};
