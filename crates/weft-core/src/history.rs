//! # History Engine
//!
//! Linear, per-graph, delta-based history with point-in-time reconstruction.
//!
//! Each `record_snapshot` call stores only what changed since the previous
//! snapshot of the same graph. Any retained snapshot can be turned back into
//! a full `Graph` by replaying the chain from its start.
//!
//! ## Chain Model
//!
//! ```text
//!  base  ──▶ S1 ──▶ S2 ──▶ ... ──▶ Sn  ==  head
//! ```
//!
//! - `base` accumulates the deltas of snapshots evicted by the retention cap,
//!   so the oldest retained snapshot still reconstructs exactly.
//! - `head` is the replayed state through the newest snapshot. New deltas are
//!   computed against it, which is equivalent to a full replay from genesis.
//!
//! A snapshot lists as removed only the ids absent from the live graph at
//! capture time. Replay upserts added and updated elements, then deletes
//! removed ids. Reconstructed nodes and edges come out in first-appearance
//! order along the chain, which can differ from live order once an element
//! is deleted and re-created.
//!
//! The engine never touches Graph Store internals: it reads through
//! `GraphStore::get_graph` and writes (on revert) through the store's public
//! add/remove calls.

use crate::clock::{SharedClock, SystemClock};
use crate::config::DEFAULT_MAX_SNAPSHOTS;
use crate::graph::{GraphStore, new_id};
use crate::state::{self, GraphState};
use crate::types::{
    EdgeChange, Graph, NodeChange, Snapshot, SnapshotComparison, SnapshotId, SnapshotMetadata,
    WeftError,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Chain {
    base: GraphState,
    snapshots: VecDeque<Snapshot>,
    head: GraphState,
}

impl Chain {
    /// Replay from `base` through the snapshot at `position` (inclusive).
    fn state_through(&self, position: usize) -> GraphState {
        let mut state = self.base.clone();
        for snapshot in self.snapshots.iter().take(position + 1) {
            state.apply(snapshot);
        }
        state
    }

    fn position_of(&self, snapshot_id: &str) -> Option<usize> {
        self.snapshots.iter().position(|s| s.id == snapshot_id)
    }
}

/// Snapshot chains for every recorded graph.
pub struct GraphHistory {
    chains: BTreeMap<String, Chain>,
    /// snapshot id -> owning graph id
    index: BTreeMap<SnapshotId, String>,
    max_snapshots: usize,
    clock: SharedClock,
}

impl Default for GraphHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOTS)
    }
}

impl GraphHistory {
    /// History retaining at most `max_snapshots` per graph (minimum 1).
    #[must_use]
    pub fn new(max_snapshots: usize) -> Self {
        Self::with_clock(max_snapshots, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(max_snapshots: usize, clock: SharedClock) -> Self {
        Self {
            chains: BTreeMap::new(),
            index: BTreeMap::new(),
            max_snapshots: max_snapshots.max(1),
            clock,
        }
    }

    #[must_use]
    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    // =========================================================================
    // RECORDING
    // =========================================================================

    /// Capture the delta between the live graph and the previous snapshot.
    pub fn record_snapshot(
        &mut self,
        store: &GraphStore,
        graph_id: &str,
        event: Option<&str>,
    ) -> Result<SnapshotId, WeftError> {
        let live = store.get_graph(graph_id)?;
        let chain = self.chains.entry(graph_id.to_string()).or_default();

        let nodes = state::diff(&chain.head.nodes, &live.nodes);
        let edges = state::diff(&chain.head.edges, &live.edges);
        let snapshot = Snapshot {
            id: new_id(),
            graph_id: graph_id.to_string(),
            timestamp: self.clock.now(),
            added_nodes: nodes.added,
            removed_node_ids: nodes.removed,
            updated_nodes: nodes.updated,
            added_edges: edges.added,
            removed_edge_ids: edges.removed,
            updated_edges: edges.updated,
            event: event.map(str::to_string),
            metadata: SnapshotMetadata {
                version: live.version,
                node_count: live.nodes.len(),
                edge_count: live.edges.len(),
                name: live.name.clone(),
                layout: live.layout.clone(),
            },
        };

        chain.head.apply(&snapshot);
        let id = snapshot.id.clone();
        tracing::info!(
            graph_id,
            snapshot_id = %id,
            version = live.version,
            added_nodes = snapshot.added_nodes.len(),
            removed_nodes = snapshot.removed_node_ids.len(),
            updated_nodes = snapshot.updated_nodes.len(),
            added_edges = snapshot.added_edges.len(),
            removed_edges = snapshot.removed_edge_ids.len(),
            updated_edges = snapshot.updated_edges.len(),
            "Snapshot recorded"
        );
        chain.snapshots.push_back(snapshot);
        self.index.insert(id.clone(), graph_id.to_string());

        while chain.snapshots.len() > self.max_snapshots {
            let Some(evicted) = chain.snapshots.pop_front() else {
                break;
            };
            chain.base.apply(&evicted);
            self.index.remove(&evicted.id);
            tracing::debug!(graph_id, snapshot_id = %evicted.id, "Snapshot evicted");
        }

        Ok(id)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Deep copy of a snapshot.
    pub fn get_snapshot(&self, snapshot_id: &str) -> Result<Snapshot, WeftError> {
        let (chain, position) = self.locate(snapshot_id)?;
        Ok(chain.snapshots[position].clone())
    }

    /// Snapshots of a graph with `start <= timestamp <= end`, oldest first.
    ///
    /// Unknown graphs yield an empty list.
    #[must_use]
    pub fn get_snapshots_by_graph(
        &self,
        graph_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<Snapshot> {
        let Some(chain) = self.chains.get(graph_id) else {
            return Vec::new();
        };
        let mut snapshots: Vec<Snapshot> = chain
            .snapshots
            .iter()
            .filter(|s| start.is_none_or(|start| s.timestamp >= start))
            .filter(|s| end.is_none_or(|end| s.timestamp <= end))
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.timestamp);
        snapshots
    }

    /// Snapshots of a graph between two instants, inclusive.
    #[must_use]
    pub fn get_graph_evolution(
        &self,
        graph_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Snapshot> {
        self.get_snapshots_by_graph(graph_id, Some(start), Some(end))
    }

    /// Newest retained snapshot of a graph.
    #[must_use]
    pub fn latest_snapshot(&self, graph_id: &str) -> Option<Snapshot> {
        self.chains
            .get(graph_id)
            .and_then(|chain| chain.snapshots.back().cloned())
    }

    /// Number of retained snapshots of a graph.
    #[must_use]
    pub fn snapshot_count(&self, graph_id: &str) -> usize {
        self.chains.get(graph_id).map_or(0, |c| c.snapshots.len())
    }

    // =========================================================================
    // RECONSTRUCTION
    // =========================================================================

    /// Graph as captured by the latest snapshot taken at or before `timestamp`.
    pub fn get_graph_state_at_time(
        &self,
        graph_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Graph, WeftError> {
        let not_found = || WeftError::NoSnapshotAt {
            graph_id: graph_id.to_string(),
            timestamp,
        };
        let chain = self.chains.get(graph_id).ok_or_else(not_found)?;

        let mut selected = None;
        for (position, snapshot) in chain.snapshots.iter().enumerate() {
            if snapshot.timestamp > timestamp {
                break;
            }
            selected = Some(position);
        }
        let position = selected.ok_or_else(not_found)?;

        Ok(materialize(chain, position))
    }

    /// Graph exactly as captured by a specific snapshot.
    pub fn get_graph_state_at_snapshot(&self, snapshot_id: &str) -> Result<Graph, WeftError> {
        let (chain, position) = self.locate(snapshot_id)?;
        Ok(materialize(chain, position))
    }

    /// Diff the reconstructed states of two snapshots, from `first` to `second`.
    pub fn compare_snapshots(
        &self,
        first: &str,
        second: &str,
    ) -> Result<SnapshotComparison, WeftError> {
        let before = self.get_graph_state_at_snapshot(first)?;
        let after = self.get_graph_state_at_snapshot(second)?;
        Ok(diff_graphs(&before, &after))
    }

    // =========================================================================
    // REVERT
    // =========================================================================

    /// Replace the live contents of a graph with a snapshot's state, then
    /// record the result as a new snapshot.
    ///
    /// Returns `false` when the snapshot is unknown, belongs to another
    /// graph, or its state cannot be restored. The live graph is only
    /// touched once the target state has been checked.
    pub fn revert_to_snapshot(
        &mut self,
        store: &mut GraphStore,
        graph_id: &str,
        snapshot_id: &str,
    ) -> bool {
        match self.index.get(snapshot_id) {
            None => {
                tracing::warn!(graph_id, snapshot_id, "revert: snapshot not found");
                return false;
            }
            Some(owner) if owner != graph_id => {
                tracing::warn!(graph_id, snapshot_id, owner = %owner, "revert: snapshot belongs to another graph");
                return false;
            }
            Some(_) => {}
        }

        let target = match self.get_graph_state_at_snapshot(snapshot_id) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(graph_id, snapshot_id, error = %e, "revert: reconstruction failed");
                return false;
            }
        };
        if let Err(e) = check_restorable(&target) {
            tracing::warn!(graph_id, snapshot_id, error = %e, "revert: target state not restorable");
            return false;
        }
        let live = match store.get_graph(graph_id) {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(graph_id, snapshot_id, error = %e, "revert: live graph unavailable");
                return false;
            }
        };

        for edge in &live.edges {
            store.remove_edge(graph_id, &edge.id);
        }
        for node in &live.nodes {
            store.remove_node(graph_id, &node.id);
        }
        // Nodes first: every restored edge needs both endpoints present.
        for node in target.nodes {
            if let Err(e) = store.restore_node(graph_id, node) {
                tracing::error!(graph_id, snapshot_id, error = %e, "revert: node restore failed");
                return false;
            }
        }
        for edge in target.edges {
            if let Err(e) = store.restore_edge(graph_id, edge) {
                tracing::error!(graph_id, snapshot_id, error = %e, "revert: edge restore failed");
                return false;
            }
        }

        let event = format!("Reverted to snapshot {snapshot_id}");
        match self.record_snapshot(store, graph_id, Some(&event)) {
            Ok(recorded) => {
                tracing::info!(graph_id, snapshot_id, recorded = %recorded, "Graph reverted");
                true
            }
            Err(e) => {
                tracing::error!(graph_id, snapshot_id, error = %e, "revert: recording failed");
                false
            }
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn locate(&self, snapshot_id: &str) -> Result<(&Chain, usize), WeftError> {
        let not_found = || WeftError::SnapshotNotFound(snapshot_id.to_string());
        let graph_id = self.index.get(snapshot_id).ok_or_else(not_found)?;
        let chain = self.chains.get(graph_id).ok_or_else(not_found)?;
        let position = chain.position_of(snapshot_id).ok_or_else(not_found)?;
        Ok((chain, position))
    }
}

fn materialize(chain: &Chain, position: usize) -> Graph {
    let state = chain.state_through(position);
    let snapshot = &chain.snapshots[position];
    Graph {
        id: snapshot.graph_id.clone(),
        name: snapshot.metadata.name.clone(),
        nodes: state.nodes.to_vec(),
        edges: state.edges.to_vec(),
        layout: snapshot.metadata.layout.clone(),
        timestamp: snapshot.timestamp,
        version: snapshot.metadata.version,
    }
}

/// Unique ids, and every edge endpoint among the graph's own nodes.
fn check_restorable(graph: &Graph) -> Result<(), WeftError> {
    let mut node_ids = BTreeSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(WeftError::DuplicateNode {
                graph_id: graph.id.clone(),
                node_id: node.id.clone(),
            });
        }
    }
    let mut edge_ids = BTreeSet::new();
    for edge in &graph.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(WeftError::DuplicateEdge {
                graph_id: graph.id.clone(),
                edge_id: edge.id.clone(),
            });
        }
        if let Some(missing) = [&edge.source_id, &edge.target_id]
            .into_iter()
            .find(|id| !node_ids.contains(id.as_str()))
        {
            return Err(WeftError::NodeNotFound {
                graph_id: graph.id.clone(),
                node_id: missing.clone(),
            });
        }
    }
    Ok(())
}

fn diff_graphs(before: &Graph, after: &Graph) -> SnapshotComparison {
    let mut comparison = SnapshotComparison::default();

    let old_nodes: BTreeMap<&str, _> = before.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let new_nodes: BTreeMap<&str, _> = after.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    for node in &after.nodes {
        match old_nodes.get(node.id.as_str()) {
            None => comparison.added_nodes.push(node.clone()),
            Some(&old) if old != node => comparison.changed_nodes.push(NodeChange {
                before: old.clone(),
                after: node.clone(),
            }),
            Some(_) => {}
        }
    }
    comparison.removed_nodes = before
        .nodes
        .iter()
        .filter(|n| !new_nodes.contains_key(n.id.as_str()))
        .cloned()
        .collect();

    let old_edges: BTreeMap<&str, _> = before.edges.iter().map(|e| (e.id.as_str(), e)).collect();
    let new_edges: BTreeMap<&str, _> = after.edges.iter().map(|e| (e.id.as_str(), e)).collect();
    for edge in &after.edges {
        match old_edges.get(edge.id.as_str()) {
            None => comparison.added_edges.push(edge.clone()),
            Some(&old) if old != edge => comparison.changed_edges.push(EdgeChange {
                before: old.clone(),
                after: edge.clone(),
            }),
            Some(_) => {}
        }
    }
    comparison.removed_edges = before
        .edges
        .iter()
        .filter(|e| !new_edges.contains_key(e.id.as_str()))
        .cloned()
        .collect();

    comparison
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{EdgeInput, EdgeType, ElementState, NodeInput, NodePatch, NodeType};
    use chrono::Duration;

    struct Fixture {
        store: GraphStore,
        history: GraphHistory,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new(max_snapshots: usize) -> Self {
            let start = DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp");
            let clock = Arc::new(ManualClock::new(start));
            let mut store = GraphStore::with_clock(clock.clone());
            store.initialize_graph("g1", "G", None);
            Self {
                store,
                history: GraphHistory::with_clock(max_snapshots, clock.clone()),
                clock,
            }
        }

        fn node(&mut self, id: &str) {
            self.store
                .add_node("g1", NodeInput::new(id, NodeType::Task, id))
                .expect("add node");
        }

        fn edge(&mut self, id: &str, from: &str, to: &str) {
            self.store
                .add_edge("g1", EdgeInput::new(id, EdgeType::Dependency, from, to))
                .expect("add edge");
        }

        fn snap(&mut self) -> SnapshotId {
            self.clock.advance(Duration::seconds(1));
            self.history
                .record_snapshot(&self.store, "g1", None)
                .expect("snapshot")
        }
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    #[test]
    fn first_snapshot_adds_everything() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        let s1 = f.snap();

        let snapshot = f.history.get_snapshot(&s1).expect("snapshot");
        assert_eq!(snapshot.added_nodes.len(), 2);
        assert_eq!(snapshot.added_edges.len(), 1);
        assert!(snapshot.removed_node_ids.is_empty());
        assert_eq!(snapshot.metadata.version, 4);
        assert_eq!(snapshot.metadata.node_count, 2);
    }

    #[test]
    fn removal_cascades_into_snapshot_delta() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        f.snap();
        assert!(f.store.remove_node("g1", "a"));
        let s2 = f.snap();

        let snapshot = f.history.get_snapshot(&s2).expect("snapshot");
        assert_eq!(snapshot.removed_node_ids, vec!["a"]);
        assert_eq!(snapshot.removed_edge_ids, vec!["e1"]);
        assert!(snapshot.added_nodes.is_empty());
        assert!(snapshot.updated_nodes.is_empty());
    }

    #[test]
    fn updates_are_detected_by_content() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.snap();
        f.clock.advance(Duration::seconds(1));
        f.store
            .update_node("g1", "a", NodePatch::state(ElementState::Completed))
            .expect("update");
        let s2 = f.snap();

        let snapshot = f.history.get_snapshot(&s2).expect("snapshot");
        assert_eq!(ids(&snapshot.updated_nodes, |n| &n.id), vec!["a"]);
        assert!(snapshot.added_nodes.is_empty());
    }

    #[test]
    fn unchanged_graph_records_empty_delta() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.snap();
        let s2 = f.snap();
        assert!(f.history.get_snapshot(&s2).expect("snapshot").is_empty_delta());
    }

    /// A node untouched by the previous snapshot must still be seen as
    /// existing, and its later removal must be recorded.
    #[test]
    fn removal_of_element_untouched_in_previous_snapshot_is_recorded() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.snap();
        f.node("c");
        let s2 = f.snap();
        assert_eq!(
            ids(&f.history.get_snapshot(&s2).expect("s2").added_nodes, |n| &n.id),
            vec!["c"]
        );

        assert!(f.store.remove_node("g1", "a"));
        let s3 = f.snap();
        let snapshot = f.history.get_snapshot(&s3).expect("s3");
        assert_eq!(snapshot.removed_node_ids, vec!["a"]);
        assert!(snapshot.added_nodes.is_empty());

        let state = f.history.get_graph_state_at_snapshot(&s3).expect("state");
        assert_eq!(ids(&state.nodes, |n| &n.id), vec!["b", "c"]);
    }

    #[test]
    fn recreated_node_is_an_update() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.snap();
        assert!(f.store.remove_node("g1", "a"));
        f.node("a");
        let s2 = f.snap();

        let snapshot = f.history.get_snapshot(&s2).expect("s2");
        assert!(snapshot.removed_node_ids.is_empty());
        assert!(snapshot.added_nodes.is_empty());
        assert_eq!(ids(&snapshot.updated_nodes, |n| &n.id), vec!["a"]);

        let rebuilt = f.history.get_graph_state_at_snapshot(&s2).expect("state");
        let live = f.store.get_graph("g1").expect("graph");
        assert_eq!(ids(&rebuilt.nodes, |n| &n.id), vec!["a", "b"]);
        assert_eq!(rebuilt.node("a"), live.node("a"));
        assert_eq!(rebuilt.node("b"), live.node("b"));
    }

    /// Snapshots taken after a revert still only remove ids that are gone.
    #[test]
    fn revert_snapshot_removes_only_absent_ids() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        let s1 = f.snap();
        assert!(f.store.remove_node("g1", "a"));
        f.node("c");
        f.snap();

        f.clock.advance(Duration::seconds(1));
        assert!(f.history.revert_to_snapshot(&mut f.store, "g1", &s1));
        let reverted = f.history.latest_snapshot("g1").expect("latest");
        assert_eq!(reverted.removed_node_ids, vec!["c"]);
        assert_eq!(ids(&reverted.added_nodes, |n| &n.id), vec!["a"]);
        assert_eq!(ids(&reverted.updated_nodes, |n| &n.id), vec!["b"]);
    }

    /// Replaying the raw chain (upsert added and updated, then delete
    /// removed) rebuilds the captured node and edge sets.
    #[test]
    fn raw_chain_replay_matches_capture() {
        let mut f = Fixture::new(50);
        let mut captured = Vec::new();
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        f.snap();
        captured.push(f.store.get_graph("g1").expect("graph"));
        assert!(f.store.remove_node("g1", "a"));
        f.node("a");
        f.edge("e2", "b", "a");
        f.snap();
        captured.push(f.store.get_graph("g1").expect("graph"));

        let sorted = |mut items: Vec<String>| {
            items.sort();
            items
        };
        let mut nodes: BTreeMap<String, crate::types::Node> = BTreeMap::new();
        let mut edges: BTreeMap<String, crate::types::Edge> = BTreeMap::new();
        for (snapshot, expected) in f
            .history
            .get_snapshots_by_graph("g1", None, None)
            .iter()
            .zip(&captured)
        {
            for node in snapshot.added_nodes.iter().chain(&snapshot.updated_nodes) {
                nodes.insert(node.id.clone(), node.clone());
            }
            for edge in snapshot.added_edges.iter().chain(&snapshot.updated_edges) {
                edges.insert(edge.id.clone(), edge.clone());
            }
            for id in &snapshot.removed_node_ids {
                nodes.remove(id);
            }
            for id in &snapshot.removed_edge_ids {
                edges.remove(id);
            }
            assert_eq!(
                nodes.keys().cloned().collect::<Vec<_>>(),
                sorted(ids(&expected.nodes, |n| &n.id))
            );
            assert_eq!(
                edges.keys().cloned().collect::<Vec<_>>(),
                sorted(ids(&expected.edges, |e| &e.id))
            );
            for node in &expected.nodes {
                assert_eq!(nodes.get(&node.id), Some(node));
            }
        }
    }

    #[test]
    fn reconstruction_replays_to_capture_time() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        let s1 = f.snap();
        let at_s1 = f.store.get_graph("g1").expect("graph");

        assert!(f.store.remove_node("g1", "a"));
        f.node("c");
        f.snap();

        let t1 = f.history.get_snapshot(&s1).expect("s1").timestamp;
        let rebuilt = f.history.get_graph_state_at_time("g1", t1).expect("state");
        assert_eq!(rebuilt.nodes, at_s1.nodes);
        assert_eq!(rebuilt.edges, at_s1.edges);
        assert_eq!(rebuilt.version, at_s1.version);
        assert_eq!(rebuilt.name, "G");
    }

    #[test]
    fn state_at_time_picks_latest_not_after_target() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.snap();
        f.node("b");
        let s2 = f.snap();
        let t2 = f.history.get_snapshot(&s2).expect("s2").timestamp;

        let between = f
            .history
            .get_graph_state_at_time("g1", t2 + Duration::milliseconds(500))
            .expect("state");
        assert_eq!(between.nodes.len(), 2);

        let before_any = f
            .history
            .get_graph_state_at_time("g1", t2 - Duration::days(1));
        assert!(matches!(before_any, Err(WeftError::NoSnapshotAt { .. })));
    }

    #[test]
    fn retention_keeps_most_recent_and_reconstructs_them() {
        let mut f = Fixture::new(3);
        let mut recorded = Vec::new();
        for i in 0..6 {
            f.node(&format!("n{i}"));
            recorded.push(f.snap());
        }

        let retained = f.history.get_snapshots_by_graph("g1", None, None);
        assert_eq!(ids(&retained, |s| &s.id), recorded[3..].to_vec());
        assert!(matches!(
            f.history.get_snapshot(&recorded[0]),
            Err(WeftError::SnapshotNotFound(_))
        ));

        // The oldest retained snapshot still sees nodes added by evicted ones.
        let oldest = f
            .history
            .get_graph_state_at_snapshot(&recorded[3])
            .expect("state");
        assert_eq!(oldest.nodes.len(), 4);
    }

    #[test]
    fn snapshots_filtered_by_time_window() {
        let mut f = Fixture::new(50);
        let mut stamps = Vec::new();
        for i in 0..4 {
            f.node(&format!("n{i}"));
            let id = f.snap();
            stamps.push(f.history.get_snapshot(&id).expect("snap").timestamp);
        }
        let window = f.history.get_graph_evolution("g1", stamps[1], stamps[2]);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, stamps[1]);
        assert!(f.history.get_snapshots_by_graph("other", None, None).is_empty());
    }

    #[test]
    fn revert_restores_structure() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        let s1 = f.snap();
        assert!(f.store.remove_node("g1", "a"));
        f.node("c");
        f.snap();

        assert!(f.history.revert_to_snapshot(&mut f.store, "g1", &s1));
        let live = f.store.get_graph("g1").expect("graph");
        assert_eq!(ids(&live.nodes, |n| &n.id), vec!["a", "b"]);
        assert_eq!(ids(&live.edges, |e| &e.id), vec!["e1"]);

        let latest = f.history.latest_snapshot("g1").expect("latest");
        assert_eq!(
            latest.event.as_deref(),
            Some(format!("Reverted to snapshot {s1}").as_str())
        );
        assert_eq!(f.history.snapshot_count("g1"), 3);
    }

    #[test]
    fn revert_soft_fails() {
        let mut f = Fixture::new(50);
        f.node("a");
        let s1 = f.snap();
        f.store.initialize_graph("g2", "Other", None);

        assert!(!f.history.revert_to_snapshot(&mut f.store, "g1", "missing"));
        assert!(!f.history.revert_to_snapshot(&mut f.store, "g2", &s1));
        assert_eq!(f.store.get_graph("g1").expect("graph").nodes.len(), 1);
    }

    #[test]
    fn unrestorable_target_leaves_graph_untouched() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        let s1 = f.snap();
        f.node("c");
        f.snap();
        let before = f.store.get_graph("g1").expect("graph");

        // Corrupt the first delta with an edge whose endpoint never existed.
        let chain = f.history.chains.get_mut("g1").expect("chain");
        let mut dangling = chain.snapshots[0].added_edges[0].clone();
        dangling.id = "e-ghost".to_string();
        dangling.target_id = "ghost".to_string();
        chain.snapshots[0].added_edges.push(dangling);

        assert!(!f.history.revert_to_snapshot(&mut f.store, "g1", &s1));
        let after = f.store.get_graph("g1").expect("graph");
        assert_eq!(after, before);
        assert_eq!(f.history.snapshot_count("g1"), 2);
    }

    #[test]
    fn duplicate_ids_are_not_restorable() {
        let mut f = Fixture::new(50);
        f.node("a");
        let mut graph = f.store.get_graph("g1").expect("graph");
        assert!(check_restorable(&graph).is_ok());

        graph.nodes.push(graph.nodes[0].clone());
        assert!(matches!(
            check_restorable(&graph),
            Err(WeftError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn compare_reports_added_removed_and_changed() {
        let mut f = Fixture::new(50);
        f.node("a");
        f.node("b");
        f.edge("e1", "a", "b");
        let s1 = f.snap();
        f.clock.advance(Duration::seconds(1));
        f.store
            .update_node("g1", "b", NodePatch::label("B2"))
            .expect("update");
        assert!(f.store.remove_node("g1", "a"));
        f.node("c");
        let s2 = f.snap();

        let diff = f.history.compare_snapshots(&s1, &s2).expect("compare");
        assert_eq!(ids(&diff.added_nodes, |n| &n.id), vec!["c"]);
        assert_eq!(ids(&diff.removed_nodes, |n| &n.id), vec!["a"]);
        assert_eq!(diff.changed_nodes.len(), 1);
        assert_eq!(diff.changed_nodes[0].before.label, "b");
        assert_eq!(diff.changed_nodes[0].after.label, "B2");
        assert_eq!(ids(&diff.removed_edges, |e| &e.id), vec!["e1"]);

        assert!(f.history.compare_snapshots(&s1, &s1).expect("same").is_identical());
        assert!(matches!(
            f.history.compare_snapshots(&s1, "nope"),
            Err(WeftError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn record_for_unknown_graph_fails() {
        let mut f = Fixture::new(50);
        let result = f.history.record_snapshot(&f.store, "nope", None);
        assert!(matches!(result, Err(WeftError::GraphNotFound(_))));
    }
}
