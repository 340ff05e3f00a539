//! # Reconstructed Graph State
//!
//! Accumulator used to replay snapshot deltas.
//!
//! Elements are keyed by id and keep first-insertion order, so a replayed
//! state lists nodes and edges in the order they originally appeared.

use crate::types::{Edge, Node, Snapshot};
use std::collections::{BTreeMap, BTreeSet};

/// A graph element addressable by id.
pub(crate) trait Element: Clone + PartialEq {
    fn element_id(&self) -> &str;
}

impl Element for Node {
    fn element_id(&self) -> &str {
        &self.id
    }
}

impl Element for Edge {
    fn element_id(&self) -> &str {
        &self.id
    }
}

/// Id-keyed collection that remembers insertion order.
#[derive(Debug, Clone)]
pub(crate) struct OrderedMap<T> {
    entries: BTreeMap<String, T>,
    order: Vec<String>,
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Element> OrderedMap<T> {
    /// Insert or overwrite. Overwriting keeps the original position.
    pub(crate) fn upsert(&mut self, id: &str, value: T) {
        if self.entries.insert(id.to_string(), value).is_none() {
            self.order.push(id.to_string());
        }
    }

    pub(crate) fn remove(&mut self, id: &str) {
        if self.entries.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Values in insertion order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub(crate) fn to_vec(&self) -> Vec<T> {
        self.values().cloned().collect()
    }
}

/// Node and edge contents of a graph at some point in its history.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphState {
    pub(crate) nodes: OrderedMap<Node>,
    pub(crate) edges: OrderedMap<Edge>,
}

impl GraphState {
    /// Apply one snapshot delta: upsert added and updated elements, then
    /// delete removed ids.
    pub(crate) fn apply(&mut self, snapshot: &Snapshot) {
        for node in snapshot.added_nodes.iter().chain(&snapshot.updated_nodes) {
            self.nodes.upsert(&node.id, node.clone());
        }
        for edge in snapshot.added_edges.iter().chain(&snapshot.updated_edges) {
            self.edges.upsert(&edge.id, edge.clone());
        }
        for id in &snapshot.removed_node_ids {
            self.nodes.remove(id);
        }
        for id in &snapshot.removed_edge_ids {
            self.edges.remove(id);
        }
    }
}

/// Changes turning `head` into `live`.
pub(crate) struct Delta<T> {
    pub(crate) added: Vec<T>,
    pub(crate) updated: Vec<T>,
    pub(crate) removed: Vec<String>,
}

/// Diff a live element list against a replayed state.
///
/// `removed` holds exactly the `head` ids absent from `live`. Live elements
/// are added when `head` lacks them and updated when their content differs.
/// Position is not part of the delta: a replayed state lists elements in
/// first-appearance order.
pub(crate) fn diff<T: Element>(head: &OrderedMap<T>, live: &[T]) -> Delta<T> {
    let live_ids: BTreeSet<&str> = live.iter().map(Element::element_id).collect();

    let mut delta = Delta {
        added: Vec::new(),
        updated: Vec::new(),
        removed: head
            .values()
            .map(Element::element_id)
            .filter(|id| !live_ids.contains(id))
            .map(str::to_string)
            .collect(),
    };
    for item in live {
        match head.get(item.element_id()) {
            None => delta.added.push(item.clone()),
            Some(previous) if previous != item => delta.updated.push(item.clone()),
            Some(_) => {}
        }
    }
    delta
}
