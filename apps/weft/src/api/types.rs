//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Every response is wrapped in `ApiResponse`: `{ "success", "data", "error" }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_core::{ErrorKind, WeftError};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler result: a JSON envelope or an `ApiError`.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a value in a successful envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

// =============================================================================
// ERRORS
// =============================================================================

/// An error rendered as an envelope with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<WeftError> for ApiError {
    fn from(error: WeftError) -> Self {
        let status = match error.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "Request rejected");
        }
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

// =============================================================================
// HEALTH
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// GRAPHS
// =============================================================================

/// Body of `POST /graphs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGraphRequest {
    /// Generated when absent or empty.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub layout: Option<String>,
}

/// Body of `POST /graphs/{id}/layout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRequest {
    pub layout: String,
}

/// Outcome of a best-effort removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

/// Outcome of a layout application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedResponse {
    pub applied: bool,
}

// =============================================================================
// HISTORY
// =============================================================================

/// Body of `POST /graphs/{id}/snapshots`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSnapshotRequest {
    #[serde(default)]
    pub event: Option<String>,
}

/// Id of a freshly recorded snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCreatedResponse {
    pub snapshot_id: String,
}

/// Query of `GET /graphs/{id}/snapshots`; both bounds inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotRangeQuery {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// Query of `GET /graphs/{id}/state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateQuery {
    pub at: DateTime<Utc>,
}

/// Body of `POST /graphs/{id}/revert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertRequest {
    pub snapshot_id: String,
}

/// Outcome of a revert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertedResponse {
    pub reverted: bool,
}

// =============================================================================
// HIGHLIGHTS
// =============================================================================

/// Body of `POST /graphs/{id}/highlights`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRequest {
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /graphs/{id}/highlights/shortest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortestPathRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of clearing a highlight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

// =============================================================================
// TESTS
// =============================================================================
