//! GPU Checker Kubernetes Integration
//!
//! Provides the Kubernetes client used to list cluster nodes.

pub mod client;

pub use client::K8sClient;
