//! Notification message composition

use crate::evaluation::{EvaluationResult, Verdict};

/// Headline for a verdict, with GPU node counts filled in
fn headline(verdict: Verdict, result: &EvaluationResult) -> String {
    let (emoji, text) = match verdict {
        Verdict::Healthy => (
            "✅",
            format!(
                "Ready GPU nodes: {} / total GPU nodes: {}",
                result.ready_gpu_node_count(),
                result.total_gpu_nodes()
            ),
        ),
        Verdict::DegradedNoReadyGpu => (
            "⚠️",
            format!(
                "{} GPU node(s) found, but none are Ready.",
                result.total_gpu_nodes()
            ),
        ),
        Verdict::NoGpu => ("❌", "No GPU nodes found.".to_string()),
    };
    format!("{} *K8s GPU node status*\n{}", emoji, text)
}

/// Render an evaluation result as a webhook message
pub fn compose(result: &EvaluationResult) -> String {
    let mut message = headline(result.verdict(), result);

    if result.gpu_nodes.is_empty() {
        return message;
    }

    message.push_str("\n\n*Node details:*");
    for node in &result.gpu_nodes {
        let ready = if node.ready { "✅ Ready" } else { "❌ Not Ready" };
        let mut gpus = format!("GPU: {}", node.total_gpus);
        if !node.gpu_breakdown.is_empty() {
            gpus.push_str(&format!(" ({})", node.gpu_breakdown.join(", ")));
        }
        message.push_str(&format!("\n• `{}`: {}, {}", node.name, ready, gpus));
    }

    message
}

/// Whether a notification should go out for this verdict
///
/// With `only_on_error`, healthy clusters stay quiet.
pub fn should_notify(verdict: Verdict, only_on_error: bool) -> bool {
    !only_on_error || !verdict.is_healthy()
}
