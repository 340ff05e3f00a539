//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Reads take the session read lock; anything that mutates a graph or the
//! history takes the write lock for the whole call.

use super::{
    AppState,
    types::{
        ApiError, ApiResult, AppliedResponse, ClearedResponse, CreateGraphRequest,
        HealthResponse, HighlightRequest, LayoutRequest, RecordSnapshotRequest, RemovedResponse,
        RevertRequest, RevertedResponse, ShortestPathRequest, SnapshotCreatedResponse,
        SnapshotRangeQuery, StateQuery, ok,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use weft_core::{
    Edge, EdgeInput, EdgePatch, Graph, GraphSummary, Highlight, Node, NodeInput, NodePatch,
    Snapshot, SnapshotComparison,
};

// =============================================================================
// HEALTH
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// GRAPHS
// =============================================================================

pub async fn list_graphs_handler(State(state): State<AppState>) -> ApiResult<Vec<GraphSummary>> {
    let session = state.session.read().await;
    ok(session.store().list_graphs())
}

/// Create (or overwrite) a graph and return it.
pub async fn create_graph_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateGraphRequest>,
) -> ApiResult<Graph> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Graph name must not be empty"));
    }
    let mut session = state.session.write().await;
    let id = session.initialize_graph(
        request.id.as_deref().unwrap_or_default(),
        &request.name,
        request.layout.as_deref(),
    );
    ok(session.store().get_graph(&id)?)
}

pub async fn get_graph_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> ApiResult<Graph> {
    let session = state.session.read().await;
    ok(session.store().get_graph(&graph_id)?)
}

// =============================================================================
// NODES
// =============================================================================

pub async fn add_node_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(input): Json<NodeInput>,
) -> ApiResult<Node> {
    let mut session = state.session.write().await;
    ok(session.store_mut().add_node(&graph_id, input)?)
}

pub async fn update_node_handler(
    State(state): State<AppState>,
    Path((graph_id, node_id)): Path<(String, String)>,
    Json(patch): Json<NodePatch>,
) -> ApiResult<Node> {
    let mut session = state.session.write().await;
    ok(session.store_mut().update_node(&graph_id, &node_id, patch)?)
}

pub async fn remove_node_handler(
    State(state): State<AppState>,
    Path((graph_id, node_id)): Path<(String, String)>,
) -> ApiResult<RemovedResponse> {
    let mut session = state.session.write().await;
    let removed = session.store_mut().remove_node(&graph_id, &node_id);
    ok(RemovedResponse { removed })
}

// =============================================================================
// EDGES
// =============================================================================

pub async fn add_edge_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(input): Json<EdgeInput>,
) -> ApiResult<Edge> {
    let mut session = state.session.write().await;
    ok(session.store_mut().add_edge(&graph_id, input)?)
}

pub async fn update_edge_handler(
    State(state): State<AppState>,
    Path((graph_id, edge_id)): Path<(String, String)>,
    Json(patch): Json<EdgePatch>,
) -> ApiResult<Edge> {
    let mut session = state.session.write().await;
    ok(session.store_mut().update_edge(&graph_id, &edge_id, patch)?)
}

pub async fn remove_edge_handler(
    State(state): State<AppState>,
    Path((graph_id, edge_id)): Path<(String, String)>,
) -> ApiResult<RemovedResponse> {
    let mut session = state.session.write().await;
    let removed = session.store_mut().remove_edge(&graph_id, &edge_id);
    ok(RemovedResponse { removed })
}

// =============================================================================
// LAYOUT
// =============================================================================

pub async fn apply_layout_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<LayoutRequest>,
) -> ApiResult<AppliedResponse> {
    let mut session = state.session.write().await;
    let applied = session.store_mut().apply_layout(&graph_id, &request.layout);
    ok(AppliedResponse { applied })
}

// =============================================================================
// HISTORY
// =============================================================================

pub async fn list_snapshots_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Query(range): Query<SnapshotRangeQuery>,
) -> ApiResult<Vec<Snapshot>> {
    let session = state.session.read().await;
    ok(session
        .history()
        .get_snapshots_by_graph(&graph_id, range.start, range.end))
}

pub async fn record_snapshot_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<RecordSnapshotRequest>,
) -> ApiResult<SnapshotCreatedResponse> {
    let mut session = state.session.write().await;
    let snapshot_id = session.record_snapshot(&graph_id, request.event.as_deref())?;
    ok(SnapshotCreatedResponse { snapshot_id })
}

/// Graph reconstructed as of `?at=<RFC 3339>`.
pub async fn graph_state_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Query(query): Query<StateQuery>,
) -> ApiResult<Graph> {
    let session = state.session.read().await;
    ok(session
        .history()
        .get_graph_state_at_time(&graph_id, query.at)?)
}

pub async fn revert_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<RevertRequest>,
) -> ApiResult<RevertedResponse> {
    let mut session = state.session.write().await;
    let reverted = session.revert_to_snapshot(&graph_id, &request.snapshot_id);
    ok(RevertedResponse { reverted })
}

pub async fn get_snapshot_handler(
    State(state): State<AppState>,
    Path(snapshot_id): Path<String>,
) -> ApiResult<Snapshot> {
    let session = state.session.read().await;
    ok(session.history().get_snapshot(&snapshot_id)?)
}

pub async fn compare_snapshots_handler(
    State(state): State<AppState>,
    Path((first, second)): Path<(String, String)>,
) -> ApiResult<SnapshotComparison> {
    let session = state.session.read().await;
    ok(session.history().compare_snapshots(&first, &second)?)
}

// =============================================================================
// HIGHLIGHTS
// =============================================================================

pub async fn list_highlights_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> ApiResult<Vec<Highlight>> {
    let session = state.session.read().await;
    // Unknown graphs are a 404 here, unlike an empty overlay list.
    session.store().get_graph(&graph_id)?;
    ok(session.highlighter().highlights(&graph_id))
}

pub async fn highlight_path_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<HighlightRequest>,
) -> ApiResult<Highlight> {
    let mut session = state.session.write().await;
    ok(session.highlight_path(&graph_id, &request.node_ids, request.reason.as_deref())?)
}

/// Highlight the shortest path; `data` is `null` when the target is unreachable.
pub async fn highlight_shortest_handler(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
    Json(request): Json<ShortestPathRequest>,
) -> ApiResult<Option<Highlight>> {
    let mut session = state.session.write().await;
    ok(session.highlight_shortest_path(
        &graph_id,
        &request.from,
        &request.to,
        request.reason.as_deref(),
    )?)
}

pub async fn clear_highlight_handler(
    State(state): State<AppState>,
    Path((graph_id, highlight_id)): Path<(String, String)>,
) -> ApiResult<ClearedResponse> {
    let mut session = state.session.write().await;
    let cleared = session.clear_highlight(&graph_id, &highlight_id);
    ok(ClearedResponse { cleared })
}
