//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::replay::{self, GraphReport, ReplayReport, ReplayScript};
use crate::{api, config::AppConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use weft_core::{Session, SystemClock, WeftError};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum replay script size (16 MB).
///
/// Scripts are read fully into memory before parsing.
const MAX_SCRIPT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WeftError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WeftError::Io(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(WeftError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` to an existing regular file.
///
/// Canonicalizing resolves `..` and symlinks before anything is read.
fn validate_file_path(path: &Path) -> Result<PathBuf, WeftError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| WeftError::Io(format!("Invalid file path '{}': {e}", path.display())))?;

    if !canonical.is_file() {
        return Err(WeftError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server with an empty in-memory session.
pub async fn cmd_serve(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), WeftError> {
    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let session = Session::with_config(config.engine.clone(), Arc::new(SystemClock))?;

    println!("weft server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:        {}", server.addr());
    println!("  Max snapshots:  {}", config.engine.history.max_snapshots);
    println!("  Default layout: {}", config.engine.layout.default);
    println!(
        "  Auth:           {}",
        if server.api_key().is_some() { "api key" } else { "disabled" }
    );
    println!();
    println!("Endpoints:");
    println!("  GET|POST /graphs                  - List / create graphs");
    println!("  POST     /graphs/{{id}}/snapshots   - Record a snapshot");
    println!("  GET      /graphs/{{id}}/state?at=   - State at a point in time");
    println!("  POST     /graphs/{{id}}/revert      - Revert to a snapshot");
    println!("  GET      /health                   - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&server, session).await
}

// =============================================================================
// REPLAY COMMAND
// =============================================================================

/// Run a replay script and print the resulting graphs and snapshot chains.
pub fn cmd_replay(
    config: &AppConfig,
    file: &Path,
    watch: bool,
    json_mode: bool,
) -> Result<(), WeftError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_SCRIPT_FILE_SIZE)?;

    let content = std::fs::read_to_string(&validated_path)
        .map_err(|e| WeftError::Io(format!("Read script: {e}")))?;
    let script = ReplayScript::parse(&content)?;

    tracing::info!(path = %validated_path.display(), steps = script.steps.len(), "Replaying script");
    let report = replay::run(&script, &config.engine, watch)?;

    if json_mode {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| WeftError::Serialization(e.to_string()))?;
        println!("{json}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    for line in &report.updates {
        println!("update {line}");
    }
    if !report.updates.is_empty() {
        println!();
    }

    println!(
        "Replayed {} steps ({} without effect)",
        report.steps, report.skipped
    );
    for graph in &report.graphs {
        println!();
        print_graph(graph);
    }
}

fn print_graph(report: &GraphReport) {
    let graph = &report.graph;
    println!(
        "Graph {} \"{}\" (version {}, layout {})",
        graph.id, graph.name, graph.version, graph.layout
    );
    println!("  Nodes: {}  Edges: {}", graph.nodes.len(), graph.edges.len());
    for node in &graph.nodes {
        println!("    {} [{:?}] {}", node.id, node.state, node.label);
    }

    println!("  Snapshots ({}):", report.snapshots.len());
    for (n, snapshot) in report.snapshots.iter().enumerate() {
        println!(
            "    {:>3}. {}  v{}  nodes +{} ~{} -{}  edges +{} ~{} -{}  {}",
            n + 1,
            snapshot.timestamp.to_rfc3339(),
            snapshot.metadata.version,
            snapshot.added_nodes.len(),
            snapshot.updated_nodes.len(),
            snapshot.removed_node_ids.len(),
            snapshot.added_edges.len(),
            snapshot.updated_edges.len(),
            snapshot.removed_edge_ids.len(),
            snapshot.event.as_deref().unwrap_or("")
        );
    }

    if !report.highlights.is_empty() {
        println!("  Highlights ({}):", report.highlights.len());
        for highlight in &report.highlights {
            println!(
                "    {}  {}  {}",
                highlight.id,
                highlight.node_ids.join(" -> "),
                highlight.reason.as_deref().unwrap_or("")
            );
        }
    }
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration as TOML.
pub fn cmd_config(config: &AppConfig) -> Result<(), WeftError> {
    print!("{}", config.to_toml()?);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
