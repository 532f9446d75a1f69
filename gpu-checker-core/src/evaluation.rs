//! Cluster aggregation and verdicts
//!
//! Partitions classified nodes into GPU nodes and Ready GPU nodes, and
//! resolves the pair of counts into a [`Verdict`].

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use serde::Serialize;
use tracing::debug;

use crate::node::{classify, NodeSnapshot};

/// Source of the cluster's node list
///
/// Implementations return one complete, point-in-time listing.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Overall GPU health of the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// At least one Ready GPU node
    Healthy,
    /// GPU nodes exist but none are Ready
    DegradedNoReadyGpu,
    /// No GPU nodes at all
    NoGpu,
}

impl Verdict {
    /// Resolve a verdict from GPU node counts
    pub fn from_counts(gpu_nodes: usize, ready_gpu_nodes: usize) -> Self {
        if ready_gpu_nodes > 0 {
            Verdict::Healthy
        } else if gpu_nodes > 0 {
            Verdict::DegradedNoReadyGpu
        } else {
            Verdict::NoGpu
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Verdict::Healthy)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Healthy => write!(f, "HEALTHY"),
            Verdict::DegradedNoReadyGpu => write!(f, "DEGRADED_NO_READY_GPU"),
            Verdict::NoGpu => write!(f, "NO_GPU"),
        }
    }
}

/// Result of evaluating one node listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Nodes with GPU capacity, in listing order
    pub gpu_nodes: Vec<NodeSnapshot>,
    /// Subset of `gpu_nodes` that are Ready, in listing order
    pub ready_gpu_nodes: Vec<NodeSnapshot>,
}

impl EvaluationResult {
    pub fn total_gpu_nodes(&self) -> usize {
        self.gpu_nodes.len()
    }

    pub fn ready_gpu_node_count(&self) -> usize {
        self.ready_gpu_nodes.len()
    }

    pub fn verdict(&self) -> Verdict {
        resolve(self)
    }
}

/// Classify every node and partition into GPU / Ready GPU nodes
pub fn aggregate(nodes: &[Node]) -> EvaluationResult {
    let mut result = EvaluationResult::default();

    for node in nodes {
        let snapshot = classify(node);
        if !snapshot.is_gpu_node() {
            continue;
        }
        debug!(
            node = %snapshot.name,
            ready = snapshot.ready,
            gpus = snapshot.total_gpus,
            "GPU node found"
        );
        if snapshot.ready {
            result.ready_gpu_nodes.push(snapshot.clone());
        }
        result.gpu_nodes.push(snapshot);
    }

    result
}

/// Map an evaluation result to its verdict
pub fn resolve(result: &EvaluationResult) -> Verdict {
    Verdict::from_counts(result.gpu_nodes.len(), result.ready_gpu_nodes.len())
}

/// List nodes from `source` and aggregate them
///
/// Listing failures are returned unchanged.
pub async fn evaluate<S: NodeSource + ?Sized>(source: &S) -> Result<EvaluationResult> {
    let nodes = source.list_nodes().await?;
    let result = aggregate(&nodes);
    debug!(
        nodes = nodes.len(),
        gpu_nodes = result.total_gpu_nodes(),
        ready_gpu_nodes = result.ready_gpu_node_count(),
        "Cluster evaluated"
    );
    Ok(result)
}
