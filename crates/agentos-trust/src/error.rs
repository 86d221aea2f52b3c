// error.rs — Trust sidecar error taxonomy, doubling as the `/proxy` HTTP
// response mapping (spec §4.6 failure semantics).
//
// `response_body` is the single place that maps a `TrustError` to a status
// and JSON body; both the `IntoResponse` impl (used by `/trace`,
// `/quarantine`) and `server::error_to_outcome` (used by `/proxy`, which
// needs to fold the response into a recorded audit entry too) call it, so
// the two surfaces can never disagree on what a given error looks like
// over the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single policy warning blocking a request pending
/// `X-User-Override: true` (spec §6 response shape).
#[derive(Debug, Clone, Serialize)]
pub struct TrustWarning {
    pub code: String,
    pub message: String,
    pub policy: String,
}

#[derive(Debug, Error)]
pub enum TrustError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("hard-blocked: {reason}")]
    HardBlocked { reason: String },

    #[error("recoverable warning: {warnings:?}")]
    WarningWithoutOverride { warnings: Vec<TrustWarning> },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend timed out")]
    BackendTimeout,

    #[error("backend returned {status}")]
    BackendError { status: u16, body: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Map a `TrustError` to its HTTP status and JSON body. The 449 body is
/// `{warnings: [{code, message, policy}], requires_override: true}`
/// (spec §6); every other variant keeps the plain `{error, ...}` shape.
pub fn response_body(err: &TrustError) -> (StatusCode, serde_json::Value) {
    match err {
        TrustError::MalformedBody(detail) => {
            (StatusCode::BAD_REQUEST, json!({ "error": "malformed_body", "detail": detail }))
        }
        TrustError::HardBlocked { reason } => {
            (StatusCode::FORBIDDEN, json!({ "error": "hard_blocked", "reason": reason }))
        }
        TrustError::WarningWithoutOverride { warnings } => (
            StatusCode::from_u16(449).expect("449 is a valid status code"),
            json!({ "warnings": warnings, "requires_override": true }),
        ),
        TrustError::BackendUnavailable(detail) => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": "backend_unavailable", "detail": detail }),
        ),
        TrustError::BackendTimeout => {
            (StatusCode::GATEWAY_TIMEOUT, json!({ "error": "backend_timeout" }))
        }
        TrustError::BackendError { status, body } => {
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            (code, json!({ "error": "backend_error", "body": body }))
        }
        TrustError::Internal(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "internal", "detail": detail }),
        ),
    }
}

impl IntoResponse for TrustError {
    fn into_response(self) -> Response {
        let (status, body) = response_body(&self);
        (status, axum::Json(body)).into_response()
    }
}
