//! # Path Highlighting
//!
//! Transient overlays that mark a path through a graph as `highlighted`.
//!
//! Highlights are written through the public `GraphStore` update calls, so
//! they bump versions, notify subscribers and show up in snapshots like any
//! other state change. Each overlay remembers the states it replaced and
//! puts them back when cleared.

use crate::graph::{GraphStore, new_id};
use crate::types::{EdgePatch, ElementState, Graph, NodePatch, WeftError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// An active path overlay on one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub graph_id: String,
    /// Path nodes in traversal order.
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    prior_nodes: BTreeMap<String, ElementState>,
    #[serde(skip)]
    prior_edges: BTreeMap<String, Option<ElementState>>,
}

/// Overlay bookkeeping for every graph.
#[derive(Debug, Default)]
pub struct PathHighlighter {
    by_graph: BTreeMap<String, Vec<Highlight>>,
}

impl PathHighlighter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight `node_ids` and every edge joining consecutive pairs
    /// (in either direction).
    pub fn highlight_path(
        &mut self,
        store: &mut GraphStore,
        graph_id: &str,
        node_ids: &[String],
        reason: Option<&str>,
    ) -> Result<Highlight, WeftError> {
        if node_ids.is_empty() {
            return Err(WeftError::InvalidInput(format!(
                "highlight on graph '{graph_id}' needs at least one node"
            )));
        }
        let graph = store.get_graph(graph_id)?;
        if let Some(missing) = node_ids.iter().find(|id| !graph.contains_node(id)) {
            return Err(WeftError::NodeNotFound {
                graph_id: graph_id.to_string(),
                node_id: missing.clone(),
            });
        }

        let edge_ids = connecting_edges(&graph, node_ids);
        let active = self.by_graph.get(graph_id).map_or(&[][..], Vec::as_slice);

        let mut prior_nodes = BTreeMap::new();
        for node in graph.nodes.iter().filter(|n| node_ids.contains(&n.id)) {
            let prior = active
                .iter()
                .find_map(|h| h.prior_nodes.get(&node.id).copied())
                .unwrap_or(node.state);
            prior_nodes.insert(node.id.clone(), prior);
        }
        let mut prior_edges = BTreeMap::new();
        for edge in graph.edges.iter().filter(|e| edge_ids.contains(&e.id)) {
            let prior = active
                .iter()
                .find_map(|h| h.prior_edges.get(&edge.id).copied())
                .unwrap_or(edge.state);
            prior_edges.insert(edge.id.clone(), prior);
        }

        for node_id in prior_nodes.keys() {
            store.update_node(graph_id, node_id, NodePatch::state(ElementState::Highlighted))?;
        }
        for edge_id in prior_edges.keys() {
            store.update_edge(graph_id, edge_id, EdgePatch::state(ElementState::Highlighted))?;
        }

        let highlight = Highlight {
            id: new_id(),
            graph_id: graph_id.to_string(),
            node_ids: node_ids.to_vec(),
            edge_ids,
            reason: reason.map(str::to_string),
            created_at: graph.timestamp,
            prior_nodes,
            prior_edges,
        };
        tracing::info!(
            graph_id,
            highlight_id = %highlight.id,
            nodes = highlight.node_ids.len(),
            edges = highlight.edge_ids.len(),
            "Path highlighted"
        );
        self.by_graph
            .entry(graph_id.to_string())
            .or_default()
            .push(highlight.clone());
        Ok(highlight)
    }

    /// Highlight the shortest directed path from `from` to `to`.
    ///
    /// Returns `Ok(None)` when `to` is unreachable.
    pub fn highlight_shortest_path(
        &mut self,
        store: &mut GraphStore,
        graph_id: &str,
        from: &str,
        to: &str,
        reason: Option<&str>,
    ) -> Result<Option<Highlight>, WeftError> {
        let graph = store.get_graph(graph_id)?;
        for endpoint in [from, to] {
            if !graph.contains_node(endpoint) {
                return Err(WeftError::NodeNotFound {
                    graph_id: graph_id.to_string(),
                    node_id: endpoint.to_string(),
                });
            }
        }

        let Some(path) = shortest_path(&graph, from, to) else {
            tracing::debug!(graph_id, from, to, "No path to highlight");
            return Ok(None);
        };
        self.highlight_path(store, graph_id, &path, reason).map(Some)
    }

    /// Active highlights of a graph, oldest first.
    #[must_use]
    pub fn highlights(&self, graph_id: &str) -> Vec<Highlight> {
        self.by_graph.get(graph_id).cloned().unwrap_or_default()
    }

    /// Remove one highlight and restore the states it replaced.
    ///
    /// Elements that were deleted, changed since, or are still covered by
    /// another highlight are left alone. Returns `false` for unknown ids.
    pub fn clear_highlight(
        &mut self,
        store: &mut GraphStore,
        graph_id: &str,
        highlight_id: &str,
    ) -> bool {
        let Some(list) = self.by_graph.get_mut(graph_id) else {
            tracing::warn!(graph_id, highlight_id, "clear_highlight: no highlights on graph");
            return false;
        };
        let Some(position) = list.iter().position(|h| h.id == highlight_id) else {
            tracing::warn!(graph_id, highlight_id, "clear_highlight: highlight not found");
            return false;
        };
        let cleared = list.remove(position);
        let still_covered_nodes: BTreeSet<&str> = list
            .iter()
            .flat_map(|h| h.prior_nodes.keys().map(String::as_str))
            .collect();
        let still_covered_edges: BTreeSet<&str> = list
            .iter()
            .flat_map(|h| h.prior_edges.keys().map(String::as_str))
            .collect();

        if let Ok(graph) = store.get_graph(graph_id) {
            restore(store, &graph, &cleared, &still_covered_nodes, &still_covered_edges);
        }
        if list.is_empty() {
            self.by_graph.remove(graph_id);
        }
        tracing::info!(graph_id, highlight_id, "Highlight cleared");
        true
    }

    /// Clear every highlight of a graph, newest first. Returns how many were
    /// removed.
    pub fn clear_all(&mut self, store: &mut GraphStore, graph_id: &str) -> usize {
        let ids: Vec<String> = self
            .by_graph
            .get(graph_id)
            .map(|list| list.iter().rev().map(|h| h.id.clone()).collect())
            .unwrap_or_default();
        ids.iter()
            .filter(|id| self.clear_highlight(store, graph_id, id))
            .count()
    }

    /// Drop the overlays of a graph without touching its elements.
    ///
    /// Used when the graph contents were replaced wholesale (revert).
    pub fn forget(&mut self, graph_id: &str) -> usize {
        self.by_graph.remove(graph_id).map_or(0, |list| list.len())
    }
}

fn restore(
    store: &mut GraphStore,
    graph: &Graph,
    cleared: &Highlight,
    covered_nodes: &BTreeSet<&str>,
    covered_edges: &BTreeSet<&str>,
) {
    for (node_id, prior) in &cleared.prior_nodes {
        let still_highlighted = graph
            .node(node_id)
            .is_some_and(|n| n.state == ElementState::Highlighted);
        if !still_highlighted || covered_nodes.contains(node_id.as_str()) {
            continue;
        }
        let patch = NodePatch::state(*prior);
        if let Err(e) = store.update_node(&graph.id, node_id, patch) {
            tracing::warn!(graph_id = %graph.id, node_id, error = %e, "Highlight restore failed");
        }
    }
    for (edge_id, prior) in &cleared.prior_edges {
        let still_highlighted = graph
            .edge(edge_id)
            .is_some_and(|e| e.state == Some(ElementState::Highlighted));
        if !still_highlighted || covered_edges.contains(edge_id.as_str()) {
            continue;
        }
        let result = match prior {
            Some(state) => store.update_edge(&graph.id, edge_id, EdgePatch::state(*state)),
            None => store.clear_edge_state(&graph.id, edge_id),
        };
        if let Err(e) = result {
            tracing::warn!(graph_id = %graph.id, edge_id, error = %e, "Highlight restore failed");
        }
    }
}

/// Edge ids joining consecutive path nodes, in path order, without repeats.
fn connecting_edges(graph: &Graph, node_ids: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut edge_ids = Vec::new();
    for pair in node_ids.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        for edge in &graph.edges {
            let joins = (&edge.source_id == a && &edge.target_id == b)
                || (&edge.source_id == b && &edge.target_id == a);
            if joins && seen.insert(edge.id.as_str()) {
                edge_ids.push(edge.id.clone());
            }
        }
    }
    edge_ids
}

/// Breadth-first search along edge direction.
fn shortest_path(graph: &Graph, from: &str, to: &str) -> Option<Vec<String>> {
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &graph.edges {
        adjacency
            .entry(edge.source_id.as_str())
            .or_default()
            .push(edge.target_id.as_str());
    }

    let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
    let mut visited = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        if current == to {
            let mut path = vec![to.to_string()];
            let mut cursor = to;
            while let Some(&previous) = parent.get(cursor) {
                path.push(previous.to_string());
                cursor = previous;
            }
            path.reverse();
            return Some(path);
        }
        for &next in adjacency.get(current).map_or(&[][..], Vec::as_slice) {
            if visited.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
