//! # Authentication Module
//!
//! Bearer API key authentication for the weft HTTP API.
//!
//! Enabled when `server.api_key` (or `WEFT_API_KEY`) is set. Every route
//! except `/health` then requires:
//!
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::types::ApiError;

/// The expected key, shared with the middleware.
pub type ApiKey = Arc<str>;

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Constant-time key comparison.
///
/// Both keys are padded to the same length so `ct_eq` always scans the same
/// number of bytes; the length check happens after the scan.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; len];
    let mut padded_expected = vec![0u8; len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// Rejects requests without a matching bearer key (`/health` is exempt).
pub async fn api_key_auth_middleware(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| keys_match(v.strip_prefix("Bearer ").unwrap_or(v), &expected));

    let reason = match authorized {
        Some(true) => return next.run(request).await,
        Some(false) => "invalid_api_key",
        None => "missing_authorization_header",
    };
    tracing::warn!(
        event = "auth_failure",
        reason,
        path = %request.uri().path(),
        "Authentication failed"
    );
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "Unauthorized".to_string(),
    }
    .into_response()
}

// =============================================================================
// TESTS
// =============================================================================
