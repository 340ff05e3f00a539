//! # Scripted Replay
//!
//! Runs a JSON script of graph operations against a fresh session whose
//! clock only moves one second per step, so every timestamp in the output
//! is reproducible.
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "init_graph", "id": "etl", "name": "Nightly ETL" },
//!     { "op": "add_node", "graph": "etl", "node": { "id": "x", "type": "task", "label": "Extract" } },
//!     { "op": "record_snapshot", "graph": "etl", "event": "seeded", "label": "seed" },
//!     { "op": "revert", "graph": "etl", "to": "seed" }
//!   ]
//! }
//! ```
//!
//! `revert` names a snapshot by the `label` given to an earlier
//! `record_snapshot` step, since generated snapshot ids are not known when
//! the script is written.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use weft_core::{
    EdgeInput, EdgePatch, EngineConfig, Graph, Highlight, ManualClock, NodeInput, NodePatch,
    Session, SharedClock, Snapshot, SnapshotId, Subscription, WeftError,
};

// =============================================================================
// SCRIPT FORMAT
// =============================================================================

/// A replay script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Clock value for the first step. Defaults to the Unix epoch.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
}

impl ReplayScript {
    /// Parse a script from JSON text.
    pub fn parse(content: &str) -> Result<Self, WeftError> {
        serde_json::from_str(content)
            .map_err(|e| WeftError::Serialization(format!("Invalid replay script: {e}")))
    }
}

/// One scripted operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    InitGraph {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        layout: Option<String>,
    },
    AddNode {
        graph: String,
        node: NodeInput,
    },
    AddEdge {
        graph: String,
        edge: EdgeInput,
    },
    UpdateNode {
        graph: String,
        id: String,
        patch: NodePatch,
    },
    UpdateEdge {
        graph: String,
        id: String,
        patch: EdgePatch,
    },
    RemoveNode {
        graph: String,
        id: String,
    },
    RemoveEdge {
        graph: String,
        id: String,
    },
    ApplyLayout {
        graph: String,
        layout: String,
    },
    RecordSnapshot {
        graph: String,
        #[serde(default)]
        event: Option<String>,
        /// Name later `revert` steps can refer to.
        #[serde(default)]
        label: Option<String>,
    },
    Revert {
        graph: String,
        to: String,
    },
    HighlightPath {
        graph: String,
        nodes: Vec<String>,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Self::InitGraph { .. } => "init_graph",
            Self::AddNode { .. } => "add_node",
            Self::AddEdge { .. } => "add_edge",
            Self::UpdateNode { .. } => "update_node",
            Self::UpdateEdge { .. } => "update_edge",
            Self::RemoveNode { .. } => "remove_node",
            Self::RemoveEdge { .. } => "remove_edge",
            Self::ApplyLayout { .. } => "apply_layout",
            Self::RecordSnapshot { .. } => "record_snapshot",
            Self::Revert { .. } => "revert",
            Self::HighlightPath { .. } => "highlight_path",
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Final state of one graph after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub graph: Graph,
    pub snapshots: Vec<Snapshot>,
    pub highlights: Vec<Highlight>,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    /// Steps that were accepted but changed nothing (unknown layout,
    /// removal of a missing element, failed revert).
    pub skipped: usize,
    pub graphs: Vec<GraphReport>,
    /// One line per subscriber notification, when watching.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<String>,
}

// =============================================================================
// RUNNER
// =============================================================================

type UpdateLog = Arc<Mutex<Vec<String>>>;

/// Run `script` on a fresh session built from `config`.
///
/// Fails on the first step that returns an error; soft failures are
/// counted in `ReplayReport::skipped`.
pub fn run(
    script: &ReplayScript,
    config: &EngineConfig,
    watch: bool,
) -> Result<ReplayReport, WeftError> {
    let clock = Arc::new(ManualClock::new(script.start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)));
    let shared: SharedClock = clock.clone();
    let mut replay = Replay {
        session: Session::with_config(config.clone(), shared)?,
        labels: BTreeMap::new(),
        graph_order: Vec::new(),
        watch: watch.then(UpdateLog::default),
        subscriptions: Vec::new(),
        skipped: 0,
    };

    for (index, step) in script.steps.iter().enumerate() {
        let applied = replay.apply(step).inspect_err(|e| {
            tracing::error!(step = index, op = step.op(), error = %e, "Replay step failed");
        })?;
        if !applied {
            tracing::warn!(step = index, op = step.op(), "Replay step had no effect");
            replay.skipped += 1;
        }
        clock.advance(Duration::seconds(1));
    }

    tracing::info!(
        steps = script.steps.len(),
        skipped = replay.skipped,
        graphs = replay.graph_order.len(),
        "Replay finished"
    );
    replay.finish(script.steps.len())
}

struct Replay {
    session: Session,
    labels: BTreeMap<String, SnapshotId>,
    /// Graph ids in first-initialized order.
    graph_order: Vec<String>,
    watch: Option<UpdateLog>,
    subscriptions: Vec<Subscription>,
    skipped: usize,
}

impl Replay {
    /// Apply one step. `Ok(false)` means the store rejected it softly.
    fn apply(&mut self, step: &Step) -> Result<bool, WeftError> {
        match step {
            Step::InitGraph { id, name, layout } => {
                let id = self.session.initialize_graph(id, name, layout.as_deref());
                if !self.graph_order.contains(&id) {
                    self.graph_order.push(id.clone());
                    self.watch_graph(&id)?;
                }
                Ok(true)
            }
            Step::AddNode { graph, node } => {
                self.session.store_mut().add_node(graph, node.clone())?;
                Ok(true)
            }
            Step::AddEdge { graph, edge } => {
                self.session.store_mut().add_edge(graph, edge.clone())?;
                Ok(true)
            }
            Step::UpdateNode { graph, id, patch } => {
                self.session
                    .store_mut()
                    .update_node(graph, id, patch.clone())?;
                Ok(true)
            }
            Step::UpdateEdge { graph, id, patch } => {
                self.session
                    .store_mut()
                    .update_edge(graph, id, patch.clone())?;
                Ok(true)
            }
            Step::RemoveNode { graph, id } => Ok(self.session.store_mut().remove_node(graph, id)),
            Step::RemoveEdge { graph, id } => Ok(self.session.store_mut().remove_edge(graph, id)),
            Step::ApplyLayout { graph, layout } => {
                Ok(self.session.store_mut().apply_layout(graph, layout))
            }
            Step::RecordSnapshot {
                graph,
                event,
                label,
            } => {
                let snapshot_id = self.session.record_snapshot(graph, event.as_deref())?;
                if let Some(label) = label {
                    self.labels.insert(label.clone(), snapshot_id);
                }
                Ok(true)
            }
            Step::Revert { graph, to } => {
                let snapshot_id = self.labels.get(to).ok_or_else(|| {
                    WeftError::InvalidInput(format!("no snapshot labelled '{to}'"))
                })?;
                Ok(self.session.revert_to_snapshot(graph, snapshot_id))
            }
            Step::HighlightPath {
                graph,
                nodes,
                reason,
            } => {
                self.session
                    .highlight_path(graph, nodes, reason.as_deref())?;
                Ok(true)
            }
        }
    }

    fn watch_graph(&mut self, graph_id: &str) -> Result<(), WeftError> {
        let Some(log) = &self.watch else {
            return Ok(());
        };
        let log = Arc::clone(log);
        let subscription = self
            .session
            .store()
            .subscribe_to_graph_updates(graph_id, move |graph| {
                let line = format!(
                    "{} {} v{}: {} nodes, {} edges",
                    graph.timestamp.to_rfc3339(),
                    graph.id,
                    graph.version,
                    graph.nodes.len(),
                    graph.edges.len()
                );
                log.lock().map_err(|e| e.to_string())?.push(line);
                Ok(())
            })?;
        self.subscriptions.push(subscription);
        Ok(())
    }

    fn finish(self, steps: usize) -> Result<ReplayReport, WeftError> {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }

        let mut graphs = Vec::with_capacity(self.graph_order.len());
        for graph_id in &self.graph_order {
            graphs.push(GraphReport {
                graph: self.session.store().get_graph(graph_id)?,
                snapshots: self
                    .session
                    .history()
                    .get_snapshots_by_graph(graph_id, None, None),
                highlights: self.session.highlighter().highlights(graph_id),
            });
        }

        let updates = match self.watch {
            Some(log) => log.lock().map(|lines| lines.clone()).unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(ReplayReport {
            steps,
            skipped: self.skipped,
            graphs,
            updates,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
