//! # Core Type Definitions
//!
//! This module contains the data model shared by every weft component:
//! - Graph elements (`Node`, `Edge`) and their enumerated categories
//! - Input and patch records used by the Graph Store write paths
//! - The `Graph` container and its `GraphSummary`
//! - Error types (`WeftError`, `ErrorKind`)
//!
//! ## Copy Discipline
//!
//! Every type here is plain owned data. Nodes and edges refer to each other
//! by id only, so `Clone` is always a full, independent deep copy.

mod snapshot;

pub use snapshot::{
    EdgeChange, NodeChange, Snapshot, SnapshotComparison, SnapshotId, SnapshotMetadata,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Open, string-keyed property bag. No schema is imposed on its contents.
pub type Properties = BTreeMap<String, serde_json::Value>;

// =============================================================================
// ENUMERATED CATEGORIES
// =============================================================================

/// Category of a node in a workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Task,
    Agent,
    Resource,
    DecisionPoint,
    Data,
    Barrier,
    Event,
    Interaction,
}

/// Category of an edge in a workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Dependency,
    ExecutionFlow,
    DataFlow,
    Communication,
    Assignment,
    Interaction,
    Contribution,
}

/// Visual/execution state of a node or edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    #[default]
    Inactive,
    Active,
    Completed,
    Error,
    Warning,
    Selected,
    Highlighted,
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered size of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

// =============================================================================
// NODE
// =============================================================================

/// A node stored in a graph.
///
/// `id` never changes and `created_at` is fixed at insertion. `updated_at`
/// is refreshed by every mutation that touches the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    pub state: ElementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Properties>,
}

/// Caller-supplied node for `GraphStore::add_node`.
///
/// Timestamps are assigned by the store. An empty `id` is replaced with a
/// generated one and a missing `state` defaults to `Inactive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInput {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Properties>,
}

impl NodeInput {
    /// Create a node input with only the required fields set.
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            properties: Properties::new(),
            state: None,
            position: None,
            size: None,
            icon: None,
            color: None,
            parent_id: None,
            child_ids: Vec::new(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: ElementState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Materialize the stored node with the given creation time.
    pub(crate) fn into_node(self, id: String, now: DateTime<Utc>) -> Node {
        Node {
            id,
            node_type: self.node_type,
            label: self.label,
            properties: self.properties,
            state: self.state.unwrap_or_default(),
            position: self.position,
            size: self.size,
            icon: self.icon,
            color: self.color,
            parent_id: self.parent_id,
            child_ids: self.child_ids,
            created_at: now,
            updated_at: now,
            metadata: self.metadata,
        }
    }
}

/// Partial update for a node. Fields left as `None` keep their current value.
///
/// The merge is shallow: a present `properties` or `metadata` map replaces
/// the stored one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, rename = "type")]
    pub node_type: Option<NodeType>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<Properties>,
}

impl NodePatch {
    /// Patch that only changes the node state.
    #[must_use]
    pub fn state(state: ElementState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Patch that only changes the node label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, node: &mut Node) {
        if let Some(node_type) = self.node_type {
            node.node_type = node_type;
        }
        if let Some(label) = self.label {
            node.label = label;
        }
        if let Some(properties) = self.properties {
            node.properties = properties;
        }
        if let Some(state) = self.state {
            node.state = state;
        }
        if let Some(position) = self.position {
            node.position = Some(position);
        }
        if let Some(size) = self.size {
            node.size = Some(size);
        }
        if let Some(icon) = self.icon {
            node.icon = Some(icon);
        }
        if let Some(color) = self.color {
            node.color = Some(color);
        }
        if let Some(parent_id) = self.parent_id {
            node.parent_id = Some(parent_id);
        }
        if let Some(child_ids) = self.child_ids {
            node.child_ids = child_ids;
        }
        if let Some(metadata) = self.metadata {
            node.metadata = Some(metadata);
        }
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed edge between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ElementState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub animated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Edge {
    /// Whether this edge has `node_id` as source or target.
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// Caller-supplied edge for `GraphStore::add_edge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInput {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub animated: bool,
}

impl EdgeInput {
    /// Create an edge input with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        edge_type: EdgeType,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type,
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: None,
            properties: Properties::new(),
            state: None,
            weight: None,
            animated: false,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn into_edge(self, id: String, now: DateTime<Utc>) -> Edge {
        Edge {
            id,
            edge_type: self.edge_type,
            source_id: self.source_id,
            target_id: self.target_id,
            label: self.label,
            properties: self.properties,
            state: self.state,
            weight: self.weight,
            animated: self.animated,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an edge. Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgePatch {
    #[serde(default, rename = "type")]
    pub edge_type: Option<EdgeType>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub state: Option<ElementState>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub animated: Option<bool>,
}

impl EdgePatch {
    /// Patch that only changes the edge state.
    #[must_use]
    pub fn state(state: ElementState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    /// Patch that moves the edge to new endpoints.
    pub fn endpoints(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            target_id: Some(target_id.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, edge: &mut Edge) {
        if let Some(edge_type) = self.edge_type {
            edge.edge_type = edge_type;
        }
        if let Some(source_id) = self.source_id {
            edge.source_id = source_id;
        }
        if let Some(target_id) = self.target_id {
            edge.target_id = target_id;
        }
        if let Some(label) = self.label {
            edge.label = Some(label);
        }
        if let Some(properties) = self.properties {
            edge.properties = properties;
        }
        if let Some(state) = self.state {
            edge.state = Some(state);
        }
        if let Some(weight) = self.weight {
            edge.weight = Some(weight);
        }
        if let Some(animated) = self.animated {
            edge.animated = animated;
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// A named, versioned collection of nodes and edges.
///
/// Node and edge lists keep insertion order. `version` starts at 1 and is
/// incremented by exactly one on every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub layout: String,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
}

impl Graph {
    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    #[must_use]
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    #[must_use]
    pub fn contains_edge(&self, edge_id: &str) -> bool {
        self.edges.iter().any(|e| e.id == edge_id)
    }

    /// Short description used by listings.
    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            layout: self.layout.clone(),
            version: self.version,
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            timestamp: self.timestamp,
        }
    }
}

/// Lightweight description of a graph, without its elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub id: String,
    pub name: String,
    pub layout: String,
    pub version: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of a `WeftError`, used by outer layers to pick a
/// response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A graph, node, edge or snapshot id did not resolve.
    NotFound,
    /// The request would break a graph invariant.
    Validation,
    /// Configuration, I/O or serialization failure.
    Internal,
}

/// Errors that can occur in weft.
///
/// Soft failures (removing something already gone, unknown layout, failed
/// revert) are not errors: those operations return `false` instead.
#[derive(Debug, Error)]
pub enum WeftError {
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Node not found: {node_id} (graph {graph_id})")]
    NodeNotFound { graph_id: String, node_id: String },

    #[error("Edge not found: {edge_id} (graph {graph_id})")]
    EdgeNotFound { graph_id: String, edge_id: String },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("No snapshot of graph {graph_id} at or before {timestamp}")]
    NoSnapshotAt {
        graph_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An edge endpoint does not resolve to a node of the same graph.
    #[error("Edge {edge_id} references missing node {node_id}")]
    MissingEndpoint { edge_id: String, node_id: String },

    #[error("Node already exists: {node_id} (graph {graph_id})")]
    DuplicateNode { graph_id: String, node_id: String },

    #[error("Edge already exists: {edge_id} (graph {graph_id})")]
    DuplicateEdge { graph_id: String, edge_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WeftError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GraphNotFound(_)
            | Self::NodeNotFound { .. }
            | Self::EdgeNotFound { .. }
            | Self::SnapshotNotFound(_)
            | Self::NoSnapshotAt { .. } => ErrorKind::NotFound,
            Self::MissingEndpoint { .. }
            | Self::DuplicateNode { .. }
            | Self::DuplicateEdge { .. }
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
