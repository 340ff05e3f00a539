//! # Graph Store
//!
//! The canonical, mutable source of truth for any number of independently
//! keyed graphs.
//!
//! Every successful write:
//! 1. bumps the graph `version` by exactly one,
//! 2. refreshes the graph `timestamp`,
//! 3. fans a deep copy of the graph out to its subscribers.
//!
//! Reads return owned copies; nothing handed out aliases internal state.

use crate::clock::{SharedClock, SystemClock};
use crate::config::LayoutConfig;
use crate::layout::{FORCE_DIRECTED, LayoutRegistry, LayoutStrategy};
use crate::subscription::{SubscriberError, SubscriberList, Subscription};
use crate::types::{
    Edge, EdgeInput, EdgePatch, Graph, GraphSummary, Node, NodeInput, NodePatch, WeftError,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Generate a fresh identifier.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// In-memory store of workflow graphs.
pub struct GraphStore {
    graphs: BTreeMap<String, Graph>,
    layouts: LayoutRegistry,
    canvas: LayoutConfig,
    subscribers: SubscriberList,
    clock: SharedClock,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Store with the system clock, built-in layouts and default canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store using the given time source.
    #[must_use]
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            graphs: BTreeMap::new(),
            layouts: LayoutRegistry::with_builtins(),
            canvas: LayoutConfig::default(),
            subscribers: SubscriberList::default(),
            clock,
        }
    }

    /// Replace the canvas used by layout strategies.
    #[must_use]
    pub fn with_canvas(mut self, canvas: LayoutConfig) -> Self {
        self.canvas = canvas;
        self
    }

    /// The canvas used by layout strategies.
    #[must_use]
    pub fn canvas(&self) -> &LayoutConfig {
        &self.canvas
    }

    // =========================================================================
    // GRAPH LIFECYCLE
    // =========================================================================

    /// Create an empty graph at version 1 and return its id.
    ///
    /// An empty `id` is replaced with a generated one. Re-initializing an
    /// existing id overwrites it.
    pub fn initialize_graph(&mut self, id: &str, name: &str, layout: Option<&str>) -> String {
        let id = if id.is_empty() {
            new_id()
        } else {
            id.to_string()
        };
        let layout = layout.unwrap_or(FORCE_DIRECTED).to_string();

        let graph = Graph {
            id: id.clone(),
            name: name.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            layout,
            timestamp: self.clock.now(),
            version: 1,
        };
        if self.graphs.insert(id.clone(), graph).is_some() {
            tracing::warn!(graph_id = %id, "Graph re-initialized, previous contents dropped");
        }
        tracing::info!(graph_id = %id, name, "Graph initialized");
        id
    }

    /// Deep copy of a graph.
    pub fn get_graph(&self, graph_id: &str) -> Result<Graph, WeftError> {
        self.graphs
            .get(graph_id)
            .cloned()
            .ok_or_else(|| WeftError::GraphNotFound(graph_id.to_string()))
    }

    #[must_use]
    pub fn contains_graph(&self, graph_id: &str) -> bool {
        self.graphs.contains_key(graph_id)
    }

    /// Summaries of every graph, ordered by id.
    #[must_use]
    pub fn list_graphs(&self) -> Vec<GraphSummary> {
        self.graphs.values().map(Graph::summary).collect()
    }

    // =========================================================================
    // NODES
    // =========================================================================

    /// Append a node and return the stored record.
    pub fn add_node(&mut self, graph_id: &str, input: NodeInput) -> Result<Node, WeftError> {
        let now = self.clock.now();
        let id = if input.id.is_empty() {
            new_id()
        } else {
            input.id.clone()
        };
        let node = input.into_node(id, now);
        self.insert_node(graph_id, node, now)
    }

    /// Re-insert a previously captured node, keeping its `created_at`.
    ///
    /// Validation, versioning and notification match `add_node`.
    pub fn restore_node(&mut self, graph_id: &str, node: Node) -> Result<Node, WeftError> {
        let now = self.clock.now();
        let node = Node {
            updated_at: now,
            ..node
        };
        self.insert_node(graph_id, node, now)
    }

    fn insert_node(
        &mut self,
        graph_id: &str,
        node: Node,
        now: DateTime<Utc>,
    ) -> Result<Node, WeftError> {
        let graph = self.graph_mut(graph_id)?;
        if graph.contains_node(&node.id) {
            return Err(WeftError::DuplicateNode {
                graph_id: graph_id.to_string(),
                node_id: node.id,
            });
        }

        graph.nodes.push(node.clone());
        touch(graph, now);
        tracing::debug!(graph_id, node_id = %node.id, version = graph.version, "Node added");

        self.publish(graph_id);
        Ok(node)
    }

    /// Merge `patch` over an existing node and return the updated record.
    pub fn update_node(
        &mut self,
        graph_id: &str,
        node_id: &str,
        patch: NodePatch,
    ) -> Result<Node, WeftError> {
        let now = self.clock.now();
        let graph = self.graph_mut(graph_id)?;
        let node = graph
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| WeftError::NodeNotFound {
                graph_id: graph_id.to_string(),
                node_id: node_id.to_string(),
            })?;

        patch.apply(node);
        node.updated_at = now;
        let updated = node.clone();

        touch(graph, now);
        tracing::debug!(graph_id, node_id, version = graph.version, "Node updated");

        self.publish(graph_id);
        Ok(updated)
    }

    /// Remove a node and every edge that references it.
    ///
    /// Returns `false` when the graph or node does not exist.
    pub fn remove_node(&mut self, graph_id: &str, node_id: &str) -> bool {
        let now = self.clock.now();
        let Some(graph) = self.graphs.get_mut(graph_id) else {
            tracing::warn!(graph_id, node_id, "remove_node: graph not found");
            return false;
        };
        let Some(position) = graph.nodes.iter().position(|n| n.id == node_id) else {
            tracing::warn!(graph_id, node_id, "remove_node: node not found");
            return false;
        };

        graph.nodes.remove(position);
        let before = graph.edges.len();
        graph.edges.retain(|e| !e.touches(node_id));
        let cascaded = before - graph.edges.len();

        touch(graph, now);
        tracing::debug!(
            graph_id,
            node_id,
            cascaded_edges = cascaded,
            version = graph.version,
            "Node removed"
        );

        self.publish(graph_id);
        true
    }

    // =========================================================================
    // EDGES
    // =========================================================================

    /// Append an edge between two existing nodes and return the stored record.
    pub fn add_edge(&mut self, graph_id: &str, input: EdgeInput) -> Result<Edge, WeftError> {
        let now = self.clock.now();
        let id = if input.id.is_empty() {
            new_id()
        } else {
            input.id.clone()
        };
        let edge = input.into_edge(id, now);
        self.insert_edge(graph_id, edge, now)
    }

    /// Re-insert a previously captured edge, keeping its `created_at`.
    pub fn restore_edge(&mut self, graph_id: &str, edge: Edge) -> Result<Edge, WeftError> {
        let now = self.clock.now();
        let edge = Edge {
            updated_at: now,
            ..edge
        };
        self.insert_edge(graph_id, edge, now)
    }

    fn insert_edge(
        &mut self,
        graph_id: &str,
        edge: Edge,
        now: DateTime<Utc>,
    ) -> Result<Edge, WeftError> {
        let graph = self.graph_mut(graph_id)?;
        check_endpoints(graph, &edge)?;
        if graph.contains_edge(&edge.id) {
            return Err(WeftError::DuplicateEdge {
                graph_id: graph_id.to_string(),
                edge_id: edge.id,
            });
        }

        graph.edges.push(edge.clone());
        touch(graph, now);
        tracing::debug!(graph_id, edge_id = %edge.id, version = graph.version, "Edge added");

        self.publish(graph_id);
        Ok(edge)
    }

    /// Merge `patch` over an existing edge and return the updated record.
    ///
    /// Changed endpoints must resolve to existing nodes; otherwise the edge
    /// is left untouched.
    pub fn update_edge(
        &mut self,
        graph_id: &str,
        edge_id: &str,
        patch: EdgePatch,
    ) -> Result<Edge, WeftError> {
        self.edit_edge(graph_id, edge_id, |edge| patch.apply(edge))
    }

    /// Unset an edge's visual state.
    pub fn clear_edge_state(&mut self, graph_id: &str, edge_id: &str) -> Result<Edge, WeftError> {
        self.edit_edge(graph_id, edge_id, |edge| edge.state = None)
    }

    fn edit_edge(
        &mut self,
        graph_id: &str,
        edge_id: &str,
        edit: impl FnOnce(&mut Edge),
    ) -> Result<Edge, WeftError> {
        let now = self.clock.now();
        let graph = self.graph_mut(graph_id)?;
        let index = graph
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| WeftError::EdgeNotFound {
                graph_id: graph_id.to_string(),
                edge_id: edge_id.to_string(),
            })?;

        let mut candidate = graph.edges[index].clone();
        edit(&mut candidate);
        check_endpoints(graph, &candidate)?;
        candidate.updated_at = now;

        graph.edges[index] = candidate.clone();
        touch(graph, now);
        tracing::debug!(graph_id, edge_id, version = graph.version, "Edge updated");

        self.publish(graph_id);
        Ok(candidate)
    }

    /// Remove an edge. Returns `false` when the graph or edge does not exist.
    pub fn remove_edge(&mut self, graph_id: &str, edge_id: &str) -> bool {
        let now = self.clock.now();
        let Some(graph) = self.graphs.get_mut(graph_id) else {
            tracing::warn!(graph_id, edge_id, "remove_edge: graph not found");
            return false;
        };
        let Some(position) = graph.edges.iter().position(|e| e.id == edge_id) else {
            tracing::warn!(graph_id, edge_id, "remove_edge: edge not found");
            return false;
        };

        graph.edges.remove(position);
        touch(graph, now);
        tracing::debug!(graph_id, edge_id, version = graph.version, "Edge removed");

        self.publish(graph_id);
        true
    }

    // =========================================================================
    // LAYOUT
    // =========================================================================

    /// Register a layout strategy under `name`.
    pub fn register_layout(&mut self, name: impl Into<String>, strategy: Box<dyn LayoutStrategy>) {
        self.layouts.register(name, strategy);
    }

    /// Names of all registered layouts.
    #[must_use]
    pub fn layout_names(&self) -> Vec<String> {
        self.layouts.names()
    }

    /// Reposition every node of a graph with the named layout.
    ///
    /// Returns `false` when the graph or layout is unknown.
    pub fn apply_layout(&mut self, graph_id: &str, layout: &str) -> bool {
        let now = self.clock.now();
        let Some(strategy) = self.layouts.get(layout) else {
            tracing::warn!(graph_id, layout, "apply_layout: unknown layout");
            return false;
        };
        let Some(graph) = self.graphs.get_mut(graph_id) else {
            tracing::warn!(graph_id, layout, "apply_layout: graph not found");
            return false;
        };

        let positions = strategy.arrange(graph, &self.canvas);
        for (node, position) in graph.nodes.iter_mut().zip(positions) {
            if node.position != Some(position) {
                node.position = Some(position);
                node.updated_at = now;
            }
        }
        graph.layout = layout.to_string();
        touch(graph, now);
        tracing::debug!(graph_id, layout, version = graph.version, "Layout applied");

        self.publish(graph_id);
        true
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Observe every future mutation of a graph.
    ///
    /// The callback is invoked once immediately with the current state, then
    /// after each successful mutation.
    pub fn subscribe_to_graph_updates<F>(
        &self,
        graph_id: &str,
        callback: F,
    ) -> Result<Subscription, WeftError>
    where
        F: FnMut(&Graph) -> Result<(), SubscriberError> + Send + 'static,
    {
        let current = self.get_graph(graph_id)?;
        let subscription = self.subscribers.add(graph_id, Box::new(callback));
        self.subscribers.notify_one(&subscription, &current);
        Ok(subscription)
    }

    /// Number of active subscriptions on a graph.
    #[must_use]
    pub fn subscriber_count(&self, graph_id: &str) -> usize {
        self.subscribers.count(graph_id)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn graph_mut(&mut self, graph_id: &str) -> Result<&mut Graph, WeftError> {
        self.graphs
            .get_mut(graph_id)
            .ok_or_else(|| WeftError::GraphNotFound(graph_id.to_string()))
    }

    fn publish(&self, graph_id: &str) {
        if let Some(graph) = self.graphs.get(graph_id) {
            let copy = graph.clone();
            self.subscribers.notify(&copy);
        }
    }
}

/// Record a mutation on the graph header.
fn touch(graph: &mut Graph, now: DateTime<Utc>) {
    graph.version = graph.version.saturating_add(1);
    graph.timestamp = now;
}

fn check_endpoints(graph: &Graph, edge: &Edge) -> Result<(), WeftError> {
    for endpoint in [&edge.source_id, &edge.target_id] {
        if !graph.contains_node(endpoint) {
            return Err(WeftError::MissingEndpoint {
                edge_id: edge.id.clone(),
                node_id: endpoint.clone(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
