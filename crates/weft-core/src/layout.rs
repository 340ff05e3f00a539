//! # Layout Strategies
//!
//! Position assignment for graph nodes, dispatched by name.
//!
//! Layouts are placeholders for a front-end renderer: they hand out starting
//! positions, they do not simulate physics. The registry starts with four
//! built-ins and accepts new strategies under new names.

use crate::config::LayoutConfig;
use crate::types::{Graph, Position};
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::TAU;

pub const FORCE_DIRECTED: &str = "force-directed";
pub const HIERARCHICAL: &str = "hierarchical";
pub const CIRCULAR: &str = "circular";
pub const GRID: &str = "grid";

// =============================================================================
// STRATEGY TRAIT
// =============================================================================

/// A named way of positioning the nodes of a graph.
pub trait LayoutStrategy: Send + Sync {
    /// Compute one position per node, in `graph.nodes` order.
    fn arrange(&self, graph: &Graph, canvas: &LayoutConfig) -> Vec<Position>;
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Layout strategies keyed by name.
pub struct LayoutRegistry {
    strategies: BTreeMap<String, Box<dyn LayoutStrategy>>,
}

impl LayoutRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry holding the four built-in layouts.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(FORCE_DIRECTED, Box::new(ForceDirected));
        registry.register(HIERARCHICAL, Box::new(Hierarchical));
        registry.register(CIRCULAR, Box::new(Circular));
        registry.register(GRID, Box::new(Grid));
        registry
    }

    /// Register (or replace) a strategy.
    pub fn register(&mut self, name: impl Into<String>, strategy: Box<dyn LayoutStrategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn LayoutStrategy> {
        self.strategies.get(name).map(Box::as_ref)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// =============================================================================
// FORCE-DIRECTED (placeholder)
// =============================================================================

/// Scatters nodes over the canvas with a jitter derived from each node id.
///
/// The same id always lands on the same spot, so repeated layouts are stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceDirected;

/// FNV-1a over the id bytes.
fn id_hash(id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

impl LayoutStrategy for ForceDirected {
    fn arrange(&self, graph: &Graph, canvas: &LayoutConfig) -> Vec<Position> {
        let usable_w = (canvas.width - 2.0 * canvas.margin).max(0.0);
        let usable_h = (canvas.height - 2.0 * canvas.margin).max(0.0);

        graph
            .nodes
            .iter()
            .map(|node| {
                let hash = id_hash(&node.id);
                let fx = (hash & 0xffff) as f64 / 65_535.0;
                let fy = ((hash >> 32) & 0xffff) as f64 / 65_535.0;
                Position::new(canvas.margin + fx * usable_w, canvas.margin + fy * usable_h)
            })
            .collect()
    }
}

// =============================================================================
// HIERARCHICAL
// =============================================================================

/// Breadth-first level assignment from the graph's roots.
///
/// Roots are nodes with in-degree 0 (or the first node when every node has
/// an incoming edge). A node's level is the maximum of `source level + 1`
/// over its incoming edges, relaxed to a fixed point. Nodes never reached sit
/// one level below the deepest one. Within a level nodes are spread evenly
/// across the canvas width.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hierarchical;

impl Hierarchical {
    /// Level of each node, in `graph.nodes` order.
    #[must_use]
    pub fn levels(graph: &Graph) -> Vec<usize> {
        let count = graph.nodes.len();
        if count == 0 {
            return Vec::new();
        }

        let index: BTreeMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; count];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
        for edge in &graph.edges {
            let (Some(&from), Some(&to)) = (
                index.get(edge.source_id.as_str()),
                index.get(edge.target_id.as_str()),
            ) else {
                continue;
            };
            in_degree[to] += 1;
            outgoing[from].push(to);
        }

        let mut roots: Vec<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        if roots.is_empty() {
            roots.push(0);
        }

        let mut levels: Vec<Option<usize>> = vec![None; count];
        let mut queue = VecDeque::new();
        for &root in &roots {
            levels[root] = Some(0);
            queue.push_back(root);
        }

        while let Some(current) = queue.pop_front() {
            let Some(level) = levels[current] else {
                continue;
            };
            let candidate = level + 1;
            // No acyclic path is longer than the node count.
            if candidate >= count {
                continue;
            }
            for &next in &outgoing[current] {
                if levels[next].is_none_or(|existing| candidate > existing) {
                    levels[next] = Some(candidate);
                    queue.push_back(next);
                }
            }
        }

        let deepest = levels.iter().flatten().copied().max().unwrap_or(0);
        levels
            .into_iter()
            .map(|level| level.unwrap_or(deepest + 1))
            .collect()
    }
}

impl LayoutStrategy for Hierarchical {
    fn arrange(&self, graph: &Graph, canvas: &LayoutConfig) -> Vec<Position> {
        let levels = Self::levels(graph);

        let mut per_level: BTreeMap<usize, usize> = BTreeMap::new();
        for &level in &levels {
            *per_level.entry(level).or_default() += 1;
        }

        let mut placed: BTreeMap<usize, usize> = BTreeMap::new();
        levels
            .iter()
            .map(|&level| {
                let total = per_level.get(&level).copied().unwrap_or(1);
                let slot = placed.entry(level).or_default();
                *slot += 1;
                let x = canvas.width * (*slot as f64) / ((total + 1) as f64);
                let y = canvas.margin + level as f64 * canvas.level_spacing;
                Position::new(x, y)
            })
            .collect()
    }
}

// =============================================================================
// CIRCULAR
// =============================================================================

/// Nodes evenly spaced on a circle centred on the canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Circular;

impl LayoutStrategy for Circular {
    fn arrange(&self, graph: &Graph, canvas: &LayoutConfig) -> Vec<Position> {
        let count = graph.nodes.len();
        let cx = canvas.width / 2.0;
        let cy = canvas.height / 2.0;
        let radius = (canvas.width.min(canvas.height) / 2.0 - canvas.margin).max(0.0);

        if count == 1 {
            return vec![Position::new(cx, cy)];
        }

        (0..count)
            .map(|i| {
                let angle = TAU * i as f64 / count as f64;
                Position::new(cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect()
    }
}

// =============================================================================
// GRID
// =============================================================================

/// Row-major grid with a square-ish column count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grid;

impl LayoutStrategy for Grid {
    fn arrange(&self, graph: &Graph, canvas: &LayoutConfig) -> Vec<Position> {
        let count = graph.nodes.len();
        let mut columns = 1usize;
        while columns * columns < count {
            columns += 1;
        }

        (0..count)
            .map(|i| {
                let row = i / columns;
                let col = i % columns;
                Position::new(
                    canvas.margin + col as f64 * canvas.grid_spacing,
                    canvas.margin + row as f64 * canvas.grid_spacing,
                )
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
