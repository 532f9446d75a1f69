//! Node classification
//!
//! Turns a raw cluster `Node` into a [`NodeSnapshot`]: readiness from the
//! `Ready` condition, GPU capacity from a fixed set of extended resources.
//! Malformed or missing fields degrade to "not ready" / "no GPU"; the
//! classifier never fails.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Node, NodeCondition, Taint};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Extended resource keys that count as GPUs, in reporting order
pub const GPU_RESOURCE_KEYS: [&str; 4] = [
    "nvidia.com/gpu",
    "amd.com/gpu",
    "gpu.intel.com/i915",
    "intel.com/gpu",
];

/// Per-resource GPU quantities for one node
///
/// Entries keep the order of [`GPU_RESOURCE_KEYS`] and never hold a zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuBreakdown {
    entries: Vec<(&'static str, u64)>,
}

impl GpuBreakdown {
    /// Iterate over `(resource key, count)` pairs in recorded order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Count recorded for a resource key, if any
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all recorded counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Render as `key:value` pairs joined by `separator`
    pub fn join(&self, separator: &str) -> String {
        self.entries
            .iter()
            .map(|(key, count)| format!("{}:{}", key, count))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn record(&mut self, key: &'static str, count: u64) {
        self.entries.push((key, count));
    }
}

impl Serialize for GpuBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Node taint, carried for display only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaintInfo {
    pub key: String,
    pub value: Option<String>,
    pub effect: String,
}

impl From<&Taint> for TaintInfo {
    fn from(taint: &Taint) -> Self {
        Self {
            key: taint.key.clone(),
            value: taint.value.clone(),
            effect: taint.effect.clone(),
        }
    }
}

/// Point-in-time view of one node's GPU capacity and readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    /// Node name (empty if the node carries no name)
    pub name: String,
    /// Whether the node reports `Ready=True`
    pub ready: bool,
    /// Total GPUs across all recognized resource keys
    #[serde(rename = "gpus")]
    pub total_gpus: u64,
    /// Per-resource GPU counts
    pub gpu_breakdown: GpuBreakdown,
    /// Node labels
    pub labels: BTreeMap<String, String>,
    /// Node taints
    pub taints: Vec<TaintInfo>,
}

impl NodeSnapshot {
    /// Whether this node exposes any GPU capacity
    pub fn is_gpu_node(&self) -> bool {
        self.total_gpus > 0
    }
}

/// Classify a cluster node
pub fn classify(node: &Node) -> NodeSnapshot {
    let gpu_breakdown = node
        .status
        .as_ref()
        .and_then(|status| status.capacity.as_ref())
        .map(gpu_capacity)
        .unwrap_or_default();

    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_deref())
        .map(is_ready)
        .unwrap_or(false);

    let taints = node
        .spec
        .as_ref()
        .and_then(|spec| spec.taints.as_ref())
        .map(|taints| taints.iter().map(TaintInfo::from).collect())
        .unwrap_or_default();

    NodeSnapshot {
        name: node.metadata.name.clone().unwrap_or_default(),
        ready,
        total_gpus: gpu_breakdown.total(),
        gpu_breakdown,
        labels: node.metadata.labels.clone().unwrap_or_default(),
        taints,
    }
}

/// True iff a `Ready` condition reports status exactly `"True"`
pub fn is_ready(conditions: &[NodeCondition]) -> bool {
    conditions
        .iter()
        .any(|cond| cond.type_ == "Ready" && cond.status == "True")
}

/// Collect recognized GPU resources from a capacity map
pub fn gpu_capacity(capacity: &BTreeMap<String, Quantity>) -> GpuBreakdown {
    let mut breakdown = GpuBreakdown::default();
    for key in GPU_RESOURCE_KEYS {
        if let Some(count) = capacity.get(key).and_then(parse_gpu_quantity) {
            breakdown.record(key, count);
        }
    }
    breakdown
}

/// Parse a GPU quantity as a positive integer
///
/// Returns `None` for empty, zero, negative, fractional or suffixed values.
pub fn parse_gpu_quantity(quantity: &Quantity) -> Option<u64> {
    let raw = quantity.0.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<u64>().ok().filter(|count| *count > 0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeSpec, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    pub(crate) fn condition(type_: &str, status: &str) -> NodeCondition {
        NodeCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn test_node(name: &str, capacity: &[(&str, &str)], ready: Option<&str>) -> Node {
        let capacity = capacity
            .iter()
            .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
            .collect();
        let conditions = ready.map(|status| {
            vec![
                condition("MemoryPressure", "False"),
                condition("Ready", status),
            ]
        });

        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: None,
            status: Some(NodeStatus {
                capacity: Some(capacity),
                conditions,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_ready_gpu_node() {
        let node = test_node("gpu-0", &[("nvidia.com/gpu", "2"), ("cpu", "32")], Some("True"));
        let snapshot = classify(&node);

        assert_eq!(snapshot.name, "gpu-0");
        assert!(snapshot.ready);
        assert_eq!(snapshot.total_gpus, 2);
        assert!(snapshot.is_gpu_node());
        assert_eq!(snapshot.gpu_breakdown.get("nvidia.com/gpu"), Some(2));
        assert_eq!(snapshot.gpu_breakdown.len(), 1);
    }

    #[test]
    fn test_ready_requires_exact_true() {
        for status in ["False", "Unknown", "true", "TRUE", ""] {
            let node = test_node("n", &[("amd.com/gpu", "1")], Some(status));
            assert!(!classify(&node).ready, "status {:?} must not be ready", status);
        }
    }

    #[test]
    fn test_ready_ignores_other_conditions() {
        let conditions = vec![condition("DiskPressure", "True"), condition("Ready", "False")];
        assert!(!is_ready(&conditions));
        assert!(!is_ready(&[]));
    }

    #[test]
    fn test_missing_status() {
        let node = Node {
            metadata: ObjectMeta::default(),
            spec: None,
            status: None,
        };
        let snapshot = classify(&node);

        assert_eq!(snapshot.name, "");
        assert!(!snapshot.ready);
        assert_eq!(snapshot.total_gpus, 0);
        assert!(snapshot.gpu_breakdown.is_empty());
        assert!(!snapshot.is_gpu_node());
    }

    #[test]
    fn test_no_conditions_not_ready() {
        let node = test_node("n", &[("nvidia.com/gpu", "4")], None);
        let snapshot = classify(&node);
        assert!(!snapshot.ready);
        assert!(snapshot.is_gpu_node());
    }

    #[test]
    fn test_unparsable_quantity_dropped() {
        let node = test_node(
            "mixed",
            &[("nvidia.com/gpu", "abc"), ("amd.com/gpu", "3")],
            Some("True"),
        );
        let snapshot = classify(&node);

        assert_eq!(snapshot.gpu_breakdown.get("nvidia.com/gpu"), None);
        assert_eq!(snapshot.gpu_breakdown.get("amd.com/gpu"), Some(3));
        assert_eq!(snapshot.total_gpus, 3);
    }

    #[test]
    fn test_zero_and_odd_quantities_dropped() {
        for raw in ["0", "", "-1", "1.5", "2k", "abc"] {
            assert_eq!(parse_gpu_quantity(&Quantity(raw.to_string())), None, "{:?}", raw);
        }
        assert_eq!(parse_gpu_quantity(&Quantity("8".to_string())), Some(8));
    }

    #[test]
    fn test_breakdown_order_and_total() {
        let node = test_node(
            "multi",
            &[
                ("intel.com/gpu", "1"),
                ("nvidia.com/gpu", "2"),
                ("gpu.intel.com/i915", "0"),
                ("amd.com/gpu", "4"),
            ],
            Some("True"),
        );
        let snapshot = classify(&node);

        let keys: Vec<_> = snapshot.gpu_breakdown.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["nvidia.com/gpu", "amd.com/gpu", "intel.com/gpu"]);
        assert_eq!(snapshot.total_gpus, snapshot.gpu_breakdown.iter().map(|(_, v)| v).sum::<u64>());
        assert_eq!(snapshot.total_gpus, 7);
        assert_eq!(
            snapshot.gpu_breakdown.join(","),
            "nvidia.com/gpu:2,amd.com/gpu:4,intel.com/gpu:1"
        );
    }

    #[test]
    fn test_unrecognized_keys_ignored() {
        let node = test_node("cpu-only", &[("cpu", "64"), ("example.com/fpga", "2")], Some("True"));
        let snapshot = classify(&node);
        assert!(!snapshot.is_gpu_node());
        assert!(snapshot.ready);
    }

    #[test]
    fn test_classify_idempotent() {
        let node = test_node("gpu-1", &[("gpu.intel.com/i915", "1")], Some("True"));
        assert_eq!(classify(&node), classify(&node));
    }

    #[test]
    fn test_taints_and_labels_passed_through() {
        let mut node = test_node("tainted", &[("nvidia.com/gpu", "1")], Some("True"));
        node.metadata.labels = Some(BTreeMap::from([(
            "node.kubernetes.io/instance-type".to_string(),
            "g5.xlarge".to_string(),
        )]));
        node.spec = Some(NodeSpec {
            taints: Some(vec![Taint {
                key: "nvidia.com/gpu".to_string(),
                value: Some("present".to_string()),
                effect: "NoSchedule".to_string(),
                time_added: None,
            }]),
            ..Default::default()
        });

        let snapshot = classify(&node);
        assert_eq!(snapshot.taints.len(), 1);
        assert_eq!(snapshot.taints[0].effect, "NoSchedule");
        assert_eq!(snapshot.labels["node.kubernetes.io/instance-type"], "g5.xlarge");
    }

    #[test]
    fn test_snapshot_serializes_breakdown_as_ordered_map() {
        let node = test_node("gpu-2", &[("amd.com/gpu", "1"), ("nvidia.com/gpu", "2")], Some("True"));
        let json = serde_json::to_string(&classify(&node)).unwrap();
        assert!(json.contains(r#""gpu_breakdown":{"nvidia.com/gpu":2,"amd.com/gpu":1}"#));
        assert!(json.contains(r#""gpus":3"#));
    }
}
