//! Integration tests for the weft HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use serde_json::{Value, json};
use weft::api::{
    ApiResponse, AppState, AppliedResponse, ClearedResponse, HealthResponse, RemovedResponse,
    RevertedResponse, SnapshotCreatedResponse, create_router,
};
use weft::config::ServerConfig;
use weft_core::{
    ElementState, Graph, GraphSummary, Highlight, Node, Session, Snapshot, SnapshotComparison,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Server config with rate limiting and auth disabled.
fn open_config() -> ServerConfig {
    ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

/// Create a test server with a fresh in-memory session.
fn create_test_server() -> TestServer {
    let router = create_router(AppState::new(Session::new()), &open_config());
    TestServer::new(router).unwrap()
}

/// Create a test server holding graph `g`: a -> b -> c.
async fn create_populated_test_server() -> TestServer {
    let server = create_test_server();
    server
        .post("/graphs")
        .json(&json!({ "id": "g", "name": "Pipeline" }))
        .await
        .assert_status_ok();
    for (id, label) in [("a", "Fetch"), ("b", "Transform"), ("c", "Store")] {
        server
            .post("/graphs/g/nodes")
            .json(&json!({ "id": id, "type": "task", "label": label }))
            .await
            .assert_status_ok();
    }
    for (id, source, target) in [("ab", "a", "b"), ("bc", "b", "c")] {
        server
            .post("/graphs/g/edges")
            .json(&json!({
                "id": id,
                "type": "execution_flow",
                "sourceId": source,
                "targetId": target
            }))
            .await
            .assert_status_ok();
    }
    server
}

async fn record(server: &TestServer, event: &str) -> String {
    let response = server
        .post("/graphs/g/snapshots")
        .json(&json!({ "event": event }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<SnapshotCreatedResponse> = response.json();
    body.data.unwrap().snapshot_id
}

async fn live_graph(server: &TestServer) -> Graph {
    let body: ApiResponse<Graph> = server.get("/graphs/g").await.json();
    body.data.unwrap()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// GRAPH LIFECYCLE TESTS
// =============================================================================

#[tokio::test]
async fn test_create_and_list_graphs() {
    let server = create_populated_test_server().await;

    let response = server.get("/graphs").await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<GraphSummary>> = response.json();
    let graphs = body.data.unwrap();
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs[0].id, "g");
    assert_eq!(graphs[0].node_count, 3);
    assert_eq!(graphs[0].edge_count, 2);
    // initialize + 3 nodes + 2 edges
    assert_eq!(graphs[0].version, 6);
}

#[tokio::test]
async fn test_create_graph_generates_id() {
    let server = create_test_server();

    let response = server
        .post("/graphs")
        .json(&json!({ "name": "Anonymous", "layout": "grid" }))
        .await;

    response.assert_status_ok();
    let body: ApiResponse<Graph> = response.json();
    let graph = body.data.unwrap();
    assert!(!graph.id.is_empty());
    assert_eq!(graph.layout, "grid");
    assert_eq!(graph.version, 1);
}

#[tokio::test]
async fn test_create_graph_empty_name_rejected() {
    let server = create_test_server();

    let response = server.post("/graphs").json(&json!({ "name": "  " })).await;

    response.assert_status_bad_request();
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
    assert!(body.error.is_some());
}

#[tokio::test]
async fn test_unknown_graph_is_404() {
    let server = create_test_server();

    let response = server.get("/graphs/missing").await;

    response.assert_status_not_found();
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
    assert!(body.error.unwrap().contains("missing"));
}

// =============================================================================
// NODE AND EDGE TESTS
// =============================================================================

#[tokio::test]
async fn test_update_node_merges_patch() {
    let server = create_populated_test_server().await;

    let response = server
        .patch("/graphs/g/nodes/a")
        .json(&json!({ "state": "active" }))
        .await;

    response.assert_status_ok();
    let body: ApiResponse<Node> = response.json();
    let node = body.data.unwrap();
    assert_eq!(node.state, ElementState::Active);
    assert_eq!(node.label, "Fetch");
}

#[tokio::test]
async fn test_update_missing_node_is_404() {
    let server = create_populated_test_server().await;

    let response = server
        .patch("/graphs/g/nodes/ghost")
        .json(&json!({ "label": "Boo" }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_edge_with_missing_endpoint_is_400() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/edges")
        .json(&json!({
            "id": "bad",
            "type": "dependency",
            "sourceId": "a",
            "targetId": "ghost"
        }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(live_graph(&server).await.edges.len(), 2);
}

#[tokio::test]
async fn test_remove_node_cascades_edges() {
    let server = create_populated_test_server().await;

    let response = server.delete("/graphs/g/nodes/b").await;
    response.assert_status_ok();
    let body: ApiResponse<RemovedResponse> = response.json();
    assert!(body.data.unwrap().removed);

    let graph = live_graph(&server).await;
    assert_eq!(graph.nodes.len(), 2);
    assert!(graph.edges.is_empty());

    // Second removal is a soft failure, not an error
    let body: ApiResponse<RemovedResponse> = server.delete("/graphs/g/nodes/b").await.json();
    assert!(!body.data.unwrap().removed);
}

#[tokio::test]
async fn test_remove_edge() {
    let server = create_populated_test_server().await;

    let body: ApiResponse<RemovedResponse> = server.delete("/graphs/g/edges/ab").await.json();
    assert!(body.data.unwrap().removed);
    assert_eq!(live_graph(&server).await.edges.len(), 1);
}

#[tokio::test]
async fn test_apply_layout() {
    let server = create_populated_test_server().await;

    let body: ApiResponse<AppliedResponse> = server
        .post("/graphs/g/layout")
        .json(&json!({ "layout": "hierarchical" }))
        .await
        .json();
    assert!(body.data.unwrap().applied);

    let graph = live_graph(&server).await;
    assert_eq!(graph.layout, "hierarchical");
    let y = |id: &str| graph.node(id).unwrap().position.unwrap().y;
    assert!(y("a") < y("b"));
    assert!(y("b") < y("c"));

    let body: ApiResponse<AppliedResponse> = server
        .post("/graphs/g/layout")
        .json(&json!({ "layout": "spiral" }))
        .await
        .json();
    assert!(!body.data.unwrap().applied);
}

// =============================================================================
// HISTORY TESTS
// =============================================================================

#[tokio::test]
async fn test_record_and_list_snapshots() {
    let server = create_populated_test_server().await;

    let first = record(&server, "seeded").await;
    server
        .patch("/graphs/g/nodes/c")
        .json(&json!({ "state": "error" }))
        .await
        .assert_status_ok();
    let second = record(&server, "c failed").await;

    let response = server.get("/graphs/g/snapshots").await;
    response.assert_status_ok();
    let body: ApiResponse<Vec<Snapshot>> = response.json();
    let snapshots = body.data.unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].id, first);
    assert_eq!(snapshots[0].added_nodes.len(), 3);
    assert_eq!(snapshots[1].id, second);
    assert_eq!(snapshots[1].updated_nodes.len(), 1);
    assert_eq!(snapshots[1].event.as_deref(), Some("c failed"));

    let response = server.get(&format!("/snapshots/{second}")).await;
    response.assert_status_ok();
    let body: ApiResponse<Snapshot> = response.json();
    assert_eq!(body.data.unwrap().metadata.node_count, 3);
}

#[tokio::test]
async fn test_snapshot_of_unknown_graph_is_404() {
    let server = create_test_server();

    let response = server
        .post("/graphs/nope/snapshots")
        .json(&json!({}))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_unknown_snapshot_is_404() {
    let server = create_test_server();

    server.get("/snapshots/nope").await.assert_status_not_found();
}

#[tokio::test]
async fn test_state_at_snapshot_time() {
    let server = create_populated_test_server().await;
    let first = record(&server, "three nodes").await;

    server.delete("/graphs/g/nodes/c").await.assert_status_ok();
    record(&server, "two nodes").await;

    let body: ApiResponse<Snapshot> = server.get(&format!("/snapshots/{first}")).await.json();
    let at = body.data.unwrap().timestamp;

    let response = server
        .get("/graphs/g/state")
        .add_query_param("at", at.to_rfc3339())
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Graph> = response.json();
    let graph = body.data.unwrap();
    // Snapshots taken within the same instant resolve to the later one
    assert!(graph.nodes.len() == 3 || graph.nodes.len() == 2);
    assert!(graph.contains_node("a"));

    let response = server
        .get("/graphs/g/state")
        .add_query_param("at", "2000-01-01T00:00:00Z")
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_compare_snapshots() {
    let server = create_populated_test_server().await;
    let first = record(&server, "before").await;

    server.delete("/graphs/g/edges/bc").await.assert_status_ok();
    server
        .patch("/graphs/g/nodes/a")
        .json(&json!({ "label": "Fetch v2" }))
        .await
        .assert_status_ok();
    let second = record(&server, "after").await;

    let response = server
        .get(&format!("/snapshots/{first}/compare/{second}"))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<SnapshotComparison> = response.json();
    let diff = body.data.unwrap();
    assert_eq!(diff.removed_edges.len(), 1);
    assert_eq!(diff.removed_edges[0].id, "bc");
    assert_eq!(diff.changed_nodes.len(), 1);
    assert_eq!(diff.changed_nodes[0].after.label, "Fetch v2");
    assert!(diff.added_nodes.is_empty());
}

#[tokio::test]
async fn test_revert_restores_snapshot() {
    let server = create_populated_test_server().await;
    let seed = record(&server, "seed").await;

    server.delete("/graphs/g/nodes/a").await.assert_status_ok();
    server
        .post("/graphs/g/nodes")
        .json(&json!({ "id": "d", "type": "agent", "label": "Reviewer" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/graphs/g/revert")
        .json(&json!({ "snapshotId": seed }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<RevertedResponse> = response.json();
    assert!(body.data.unwrap().reverted);

    let graph = live_graph(&server).await;
    let mut ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(graph.edges.len(), 2);

    // The revert itself is recorded
    let body: ApiResponse<Vec<Snapshot>> = server.get("/graphs/g/snapshots").await.json();
    let snapshots = body.data.unwrap();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[1].event.as_deref().unwrap().contains(&seed));
}

#[tokio::test]
async fn test_revert_unknown_snapshot_is_soft_failure() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/revert")
        .json(&json!({ "snapshotId": "nope" }))
        .await;

    response.assert_status_ok();
    let body: ApiResponse<RevertedResponse> = response.json();
    assert!(!body.data.unwrap().reverted);
    assert_eq!(live_graph(&server).await.nodes.len(), 3);
}

// =============================================================================
// HIGHLIGHT TESTS
// =============================================================================

#[tokio::test]
async fn test_highlight_and_clear_path() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/highlights")
        .json(&json!({ "nodeIds": ["a", "b"], "reason": "hot path" }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Highlight> = response.json();
    let highlight = body.data.unwrap();
    assert_eq!(highlight.edge_ids, vec!["ab".to_string()]);

    let graph = live_graph(&server).await;
    assert_eq!(graph.node("a").unwrap().state, ElementState::Highlighted);
    assert_eq!(graph.edge("ab").unwrap().state, Some(ElementState::Highlighted));
    assert_eq!(graph.node("c").unwrap().state, ElementState::Inactive);

    let body: ApiResponse<Vec<Highlight>> = server.get("/graphs/g/highlights").await.json();
    assert_eq!(body.data.unwrap().len(), 1);

    let body: ApiResponse<ClearedResponse> = server
        .delete(&format!("/graphs/g/highlights/{}", highlight.id))
        .await
        .json();
    assert!(body.data.unwrap().cleared);

    let graph = live_graph(&server).await;
    assert_eq!(graph.node("a").unwrap().state, ElementState::Inactive);
    assert_eq!(graph.edge("ab").unwrap().state, None);
}

#[tokio::test]
async fn test_highlight_missing_node_is_404() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/highlights")
        .json(&json!({ "nodeIds": ["a", "ghost"] }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_highlight_empty_path_is_400() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/highlights")
        .json(&json!({ "nodeIds": [] }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_highlight_shortest_path() {
    let server = create_populated_test_server().await;

    let response = server
        .post("/graphs/g/highlights/shortest")
        .json(&json!({ "from": "a", "to": "c" }))
        .await;
    response.assert_status_ok();
    let body: ApiResponse<Option<Highlight>> = response.json();
    let highlight = body.data.unwrap().unwrap();
    assert_eq!(highlight.node_ids, vec!["a", "b", "c"]);

    // Edges are directed: no way back
    let body: ApiResponse<Value> = server
        .post("/graphs/g/highlights/shortest")
        .json(&json!({ "from": "c", "to": "a" }))
        .await
        .json();
    assert!(body.success);
    assert!(body.data.is_none());
}

#[tokio::test]
async fn test_highlights_of_unknown_graph_is_404() {
    let server = create_test_server();

    server
        .get("/graphs/nope/highlights")
        .await
        .assert_status_not_found();
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let server = create_test_server();

    let response = server.get("/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = create_test_server();

    let response = server
        .post("/graphs")
        .text("not valid json")
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Create a test server with authentication enabled.
fn create_auth_test_server(api_key: &str) -> TestServer {
    let config = ServerConfig {
        api_key: Some(api_key.to_string()),
        ..open_config()
    };
    let router = create_router(AppState::new(Session::new()), &config);
    TestServer::new(router).unwrap()
}

fn bearer(value: &str) -> HeaderValue {
    value.parse::<HeaderValue>().unwrap()
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/graphs")
        .add_header(AUTHORIZATION, bearer(&format!("Bearer {api_key}")))
        .await;

    response.assert_status_ok();
    let body: ApiResponse<Vec<GraphSummary>> = response.json();
    assert!(body.data.unwrap().is_empty());
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/graphs")
        .add_header(AUTHORIZATION, bearer(api_key))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/graphs")
        .add_header(AUTHORIZATION, bearer("Bearer wrong-key"))
        .await;

    assert_eq!(
        response.status_code(),
        StatusCode::UNAUTHORIZED,
        "Invalid token should return 401 Unauthorized"
    );
    let body: ApiResponse<Value> = response.json();
    assert!(!body.success);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("required-key");

    let response = server.get("/graphs").await;

    assert_eq!(
        response.status_code(),
        StatusCode::UNAUTHORIZED,
        "Missing Authorization header should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_auth_bearer_prefix_only_rejected() {
    let server = create_auth_test_server("actual-key");

    let response = server
        .get("/graphs")
        .add_header(AUTHORIZATION, bearer("Bearer "))
        .await;

    assert_eq!(
        response.status_code(),
        StatusCode::UNAUTHORIZED,
        "Bearer prefix with no key should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_empty_configured_key_disables_auth() {
    let server = create_auth_test_server("");

    server.get("/graphs").await.assert_status_ok();
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let router = create_router(AppState::new(Session::new()), &config);
    let server = TestServer::new(router).unwrap();

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
}
