//! Console rendering of evaluation results

use chrono::{DateTime, Utc};
use serde::Serialize;

use gpu_checker_core::{EvaluationResult, NodeSnapshot, Verdict};

/// Machine-readable report printed with `--json`
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub total_nodes: usize,
    pub ready_nodes: usize,
    pub nodes: &'a [NodeSnapshot],
    pub checked_at: DateTime<Utc>,
}

impl<'a> JsonReport<'a> {
    pub fn new(result: &'a EvaluationResult, checked_at: DateTime<Utc>) -> Self {
        Self {
            total_nodes: result.total_gpu_nodes(),
            ready_nodes: result.ready_gpu_node_count(),
            nodes: &result.gpu_nodes,
            checked_at,
        }
    }
}

/// Error body printed with `--json` when the run fails
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub error: String,
}

/// One-line verdict summary
pub fn render_summary(result: &EvaluationResult) -> String {
    match result.verdict() {
        Verdict::Healthy => format!(
            "✅ Ready GPU nodes: {} / total GPU nodes: {}",
            result.ready_gpu_node_count(),
            result.total_gpu_nodes()
        ),
        Verdict::DegradedNoReadyGpu => format!(
            "⚠️ {} GPU node(s) found, but none are Ready.",
            result.total_gpu_nodes()
        ),
        Verdict::NoGpu => "❌ No GPU nodes found.".to_string(),
    }
}

/// GPU node table with a dynamically sized name column
pub fn render_table(gpu_nodes: &[NodeSnapshot]) -> String {
    if gpu_nodes.is_empty() {
        return "No GPU nodes exist in the cluster.".to_string();
    }

    const NAME: &str = "NAME";
    const READY: &str = "READY";
    const TOTAL: &str = "GPU(TOTAL)";
    const KEYS: &str = "GPU(KEYS)";

    let w_name = gpu_nodes
        .iter()
        .map(|node| node.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(NAME.len());
    let w_ready = READY.len();
    let w_total = TOTAL.len();

    let mut lines = vec![
        format!("{:<w_name$}  {:<w_ready$}  {:<w_total$}  {}", NAME, READY, TOTAL, KEYS),
        format!(
            "{}  {}  {}  {}",
            "-".repeat(w_name),
            "-".repeat(w_ready),
            "-".repeat(w_total),
            "-".repeat(KEYS.len())
        ),
    ];

    for node in gpu_nodes {
        let keys = if node.gpu_breakdown.is_empty() {
            "-".to_string()
        } else {
            node.gpu_breakdown.join(",")
        };
        let ready = if node.ready { "True" } else { "False" };
        lines.push(format!(
            "{:<w_name$}  {:<w_ready$}  {:<w_total$}  {}",
            node.name, ready, node.total_gpus, keys
        ));
    }

    lines.join("\n")
}
