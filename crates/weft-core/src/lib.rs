//! # weft-core
//!
//! The in-memory workflow graph engine for weft - THE LOGIC.
//!
//! This crate holds everything a visualization front-end needs to render a
//! workflow and scrub through its past:
//!
//! - `graph`: the Graph Store, single owner of live node/edge data
//! - `layout`: pluggable placement strategies
//! - `history`: delta snapshots, point-in-time reconstruction, diff, revert
//! - `highlight`: path overlays written through the store
//! - `session`: one store + history + highlighter sharing a clock and config
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Keeps all state in memory for the lifetime of the process
//! - Takes time from an injected `Clock`, never directly from the OS
//! - Logs through `tracing`; the host decides where events go

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod config;
pub mod graph;
pub mod highlight;
pub mod history;
pub mod layout;
pub mod session;
mod state;
pub mod subscription;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Edge, EdgeChange, EdgeInput, EdgePatch, EdgeType, ElementState, ErrorKind, Graph,
    GraphSummary, Node, NodeChange, NodeInput, NodePatch, NodeType, Position, Properties, Size,
    Snapshot, SnapshotComparison, SnapshotId, SnapshotMetadata, WeftError,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{DEFAULT_MAX_SNAPSHOTS, EngineConfig, HistoryConfig, LayoutConfig};
pub use graph::GraphStore;
pub use highlight::{Highlight, PathHighlighter};
pub use history::GraphHistory;
pub use layout::{LayoutRegistry, LayoutStrategy};
pub use session::Session;
pub use subscription::{SubscriberError, Subscription};
