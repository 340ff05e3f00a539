//! # Session Module
//!
//! One engine instance: a Graph Store, its History Engine and the path
//! highlight overlays, all sharing one clock and one configuration.
//!
//! The store stays the single owner of live graph data. Calls that span
//! components (snapshot, revert, highlight) are routed through here so the
//! borrow of the store and the history never have to be juggled by callers.

use crate::clock::{SharedClock, SystemClock};
use crate::config::EngineConfig;
use crate::graph::GraphStore;
use crate::highlight::{Highlight, PathHighlighter};
use crate::history::GraphHistory;
use crate::types::{SnapshotId, WeftError};
use std::sync::Arc;

/// A Graph Store, History Engine and highlighter bundled together.
pub struct Session {
    store: GraphStore,
    history: GraphHistory,
    highlighter: PathHighlighter,
    config: EngineConfig,
    clock: SharedClock,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session with default configuration and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineConfig::default(), Arc::new(SystemClock))
    }

    /// Session from an explicit configuration and time source.
    ///
    /// # Errors
    ///
    /// Returns `WeftError::Config` when the configuration is invalid.
    pub fn with_config(config: EngineConfig, clock: SharedClock) -> Result<Self, WeftError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: EngineConfig, clock: SharedClock) -> Self {
        let store = GraphStore::with_clock(Arc::clone(&clock)).with_canvas(config.layout.clone());
        let history = GraphHistory::with_clock(config.history.max_snapshots, Arc::clone(&clock));
        tracing::debug!(
            max_snapshots = config.history.max_snapshots,
            default_layout = %config.layout.default,
            "Session created"
        );
        Self {
            store,
            history,
            highlighter: PathHighlighter::new(),
            config,
            clock,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    #[must_use]
    pub fn history(&self) -> &GraphHistory {
        &self.history
    }

    #[must_use]
    pub fn highlighter(&self) -> &PathHighlighter {
        &self.highlighter
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    // =========================================================================
    // CROSS-COMPONENT OPERATIONS
    // =========================================================================

    /// Create a graph, falling back to the configured default layout.
    pub fn initialize_graph(&mut self, id: &str, name: &str, layout: Option<&str>) -> String {
        let layout = layout.unwrap_or(&self.config.layout.default);
        self.store.initialize_graph(id, name, Some(layout))
    }

    /// Snapshot the live state of a graph.
    pub fn record_snapshot(
        &mut self,
        graph_id: &str,
        event: Option<&str>,
    ) -> Result<SnapshotId, WeftError> {
        self.history.record_snapshot(&self.store, graph_id, event)
    }

    /// Roll a graph back to a snapshot. See `GraphHistory::revert_to_snapshot`.
    ///
    /// Active highlights of the graph are discarded on success; the reverted
    /// states already reflect whatever was highlighted at capture time.
    pub fn revert_to_snapshot(&mut self, graph_id: &str, snapshot_id: &str) -> bool {
        let reverted = self
            .history
            .revert_to_snapshot(&mut self.store, graph_id, snapshot_id);
        if reverted {
            self.highlighter.forget(graph_id);
        }
        reverted
    }

    pub fn highlight_path(
        &mut self,
        graph_id: &str,
        node_ids: &[String],
        reason: Option<&str>,
    ) -> Result<Highlight, WeftError> {
        self.highlighter
            .highlight_path(&mut self.store, graph_id, node_ids, reason)
    }

    pub fn highlight_shortest_path(
        &mut self,
        graph_id: &str,
        from: &str,
        to: &str,
        reason: Option<&str>,
    ) -> Result<Option<Highlight>, WeftError> {
        self.highlighter
            .highlight_shortest_path(&mut self.store, graph_id, from, to, reason)
    }

    pub fn clear_highlight(&mut self, graph_id: &str, highlight_id: &str) -> bool {
        self.highlighter
            .clear_highlight(&mut self.store, graph_id, highlight_id)
    }

    pub fn clear_all_highlights(&mut self, graph_id: &str) -> usize {
        self.highlighter.clear_all(&mut self.store, graph_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
