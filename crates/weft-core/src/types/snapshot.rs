//! Snapshot records produced by the history engine.

use super::{Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a recorded snapshot.
pub type SnapshotId = String;

/// Graph-level facts captured alongside a snapshot delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub name: String,
    pub layout: String,
}

/// An immutable delta relative to the previous snapshot of the same graph.
///
/// The first snapshot of a graph lists every element as added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub graph_id: String,
    pub timestamp: DateTime<Utc>,
    pub added_nodes: Vec<Node>,
    pub removed_node_ids: Vec<String>,
    pub updated_nodes: Vec<Node>,
    pub added_edges: Vec<Edge>,
    pub removed_edge_ids: Vec<String>,
    pub updated_edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    /// True when the snapshot carries no element changes.
    #[must_use]
    pub fn is_empty_delta(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_node_ids.is_empty()
            && self.updated_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edge_ids.is_empty()
            && self.updated_edges.is_empty()
    }
}

/// A node present in both compared states whose contents differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChange {
    pub before: Node,
    pub after: Node,
}

/// An edge present in both compared states whose contents differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeChange {
    pub before: Edge,
    pub after: Edge,
}

/// Difference between the reconstructed states of two snapshots.
///
/// Buckets read from the first snapshot towards the second: `added_*` exist
/// only in the second state, `removed_*` only in the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotComparison {
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub changed_nodes: Vec<NodeChange>,
    pub added_edges: Vec<Edge>,
    pub removed_edges: Vec<Edge>,
    pub changed_edges: Vec<EdgeChange>,
}

impl SnapshotComparison {
    /// True when both states are structurally identical.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.changed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
            && self.changed_edges.is_empty()
    }
}
