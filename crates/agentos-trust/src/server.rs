// server.rs — axum router and `/proxy` pipeline (spec §4.6).

use std::sync::Arc;
use std::time::Instant;

use agentos_audit::hasher;
use agentos_audit::{AuditEntry, RecordedEffect};
use agentos_primitives::{ActionType, SignalKind};
use agentos_signal::Signal;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::{TrustError, TrustWarning};
use crate::manifest::{Reversibility, Retention};
use crate::screen::{screen_payload, SensitiveKind};
use crate::state::SidecarState;

pub fn build_router(state: Arc<SidecarState>) -> Router {
    Router::new()
        .route("/.well-known/agent-manifest", get(get_manifest))
        .route("/proxy", axum::routing::post(proxy))
        .route("/health", get(health))
        .route("/trace/{trace_id}", get(get_trace))
        .route("/quarantine/{trace_id}", get(get_quarantine))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_manifest(State(state): State<Arc<SidecarState>>) -> Json<crate::manifest::CapabilityManifest> {
    Json(state.manifest.clone())
}

async fn health(State(state): State<Arc<SidecarState>>) -> Json<serde_json::Value> {
    let backend_reachable = state
        .http
        .get(&state.backend_url)
        .send()
        .await
        .map(|resp| resp.status().is_success() || resp.status().is_redirection())
        .unwrap_or(false);

    Json(serde_json::json!({
        "sidecar": "ok",
        "backend_reachable": backend_reachable,
        "circuit_state": format!("{:?}", state.breaker.state()),
    }))
}

async fn get_trace(
    State(state): State<Arc<SidecarState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<AuditEntry>, TrustError> {
    let recorder = state.recorder.lock().expect("flight recorder lock poisoned");
    let mut entries = recorder
        .read_recent(&trace_id, 1)
        .map_err(|e| TrustError::Internal(e.to_string()))?;
    entries.pop().map(Json).ok_or_else(|| TrustError::Internal(format!("no trace {trace_id}")))
}

async fn get_quarantine(
    State(state): State<Arc<SidecarState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<crate::quarantine::QuarantineRecord>, TrustError> {
    state
        .quarantine
        .get(&trace_id)
        .map(Json)
        .ok_or_else(|| TrustError::Internal(format!("no quarantine record for {trace_id}")))
}

struct ProxyOutcome {
    status: StatusCode,
    body: Vec<u8>,
    quarantined: bool,
    decision: RecordedEffect,
    reason: String,
    signals: Vec<SignalKind>,
}

async fn proxy(State(state): State<Arc<SidecarState>>, headers: HeaderMap, body: Bytes) -> Response {
    let trace_id = headers
        .get("x-agent-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let override_present = headers
        .get("x-user-override")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let started = Instant::now();
    let outcome = run_pipeline(&state, &trace_id, override_present, &body).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let outcome = match outcome {
        Ok(o) => o,
        Err(err) => error_to_outcome(err),
    };

    let args_digest = hasher::hash_str(&String::from_utf8_lossy(&body));
    let entry = AuditEntry::draft(
        trace_id.clone(),
        ActionType::ApiCall,
        "trust_sidecar_proxy",
        args_digest,
        outcome.decision,
        outcome.reason.clone(),
        outcome.signals.clone(),
    );
    if let Ok(mut recorder) = state.recorder.lock() {
        if let Err(e) = recorder.append(entry) {
            tracing::error!(error = %e, "failed to record trust sidecar trace");
        }
    }

    for kind in &outcome.signals {
        let _ = state.signals.send(&state.manifest.agent_id, Signal::new(*kind, "trust_sidecar"));
    }

    let trust_score = state.manifest.trust_score();
    Response::builder()
        .status(outcome.status)
        .header("x-agent-trace-id", trace_id)
        .header("x-agent-trust-score", trust_score.to_string())
        .header("x-agent-latency-ms", latency_ms.to_string())
        .header("x-agent-quarantined", outcome.quarantined.to_string())
        .body(axum::body::Body::from(outcome.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn run_pipeline(
    state: &SidecarState,
    trace_id: &str,
    override_present: bool,
    body: &[u8],
) -> Result<ProxyOutcome, TrustError> {
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| TrustError::MalformedBody(e.to_string()))?;

    let screen = screen_payload(&payload, state.scan_email_phone);
    let manifest = &state.manifest;

    if screen.has_kind(SensitiveKind::CreditCard) && manifest.retention == Retention::Permanent {
        return Err(TrustError::HardBlocked {
            reason: "credit card number with permanent retention policy".to_string(),
        });
    }
    if screen.has_kind(SensitiveKind::Ssn) && manifest.retention != Retention::Ephemeral {
        return Err(TrustError::HardBlocked {
            reason: "SSN with non-ephemeral retention policy".to_string(),
        });
    }

    let mut warnings = Vec::new();
    let trust_score = manifest.trust_score();
    if trust_score < 7 {
        warnings.push(TrustWarning {
            code: "low_trust_score".to_string(),
            message: format!("trust score {trust_score} below threshold 7"),
            policy: "trust_score_threshold".to_string(),
        });
    }
    if manifest.reversibility == Reversibility::None {
        warnings.push(TrustWarning {
            code: "irreversible_action".to_string(),
            message: "backend action is not reversible".to_string(),
            policy: "reversibility".to_string(),
        });
    }
    if matches!(manifest.retention, Retention::Permanent | Retention::Forever) {
        warnings.push(TrustWarning {
            code: "retention_policy".to_string(),
            message: format!("retention policy is {:?}", manifest.retention),
            policy: "retention".to_string(),
        });
    }
    if manifest.human_review {
        warnings.push(TrustWarning {
            code: "human_review_required".to_string(),
            message: "backend requires human review".to_string(),
            policy: "human_review".to_string(),
        });
    }

    let quarantined = if !warnings.is_empty() {
        if !override_present {
            return Err(TrustError::WarningWithoutOverride { warnings });
        }
        let messages = warnings.into_iter().map(|w| w.message).collect();
        state.quarantine.record(trace_id, messages);
        true
    } else {
        false
    };

    state.breaker.allow_call().map_err(|e| TrustError::BackendUnavailable(e.to_string()))?;

    let response = state
        .http
        .post(&state.backend_url)
        .header("x-agent-trace-id", trace_id)
        .json(&payload)
        .send()
        .await;

    let response = match response {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            state.breaker.record_failure();
            return Ok(ProxyOutcome {
                status: StatusCode::GATEWAY_TIMEOUT,
                body: b"{\"error\":\"backend_timeout\"}".to_vec(),
                quarantined,
                decision: RecordedEffect::Warn,
                reason: "backend timeout".to_string(),
                signals: vec![SignalKind::Sigbudget],
            });
        }
        Err(e) => {
            state.breaker.record_failure();
            return Err(TrustError::BackendUnavailable(e.to_string()));
        }
    };

    state.breaker.record_success();
    let status = response.status();
    let response_body = response.bytes().await.map_err(|e| TrustError::Internal(e.to_string()))?;

    let decision = if status.is_server_error() {
        RecordedEffect::Warn
    } else {
        RecordedEffect::Allow
    };

    Ok(ProxyOutcome {
        status,
        body: response_body.to_vec(),
        quarantined,
        decision,
        reason: format!("forwarded to backend, status {}", status.as_u16()),
        signals: Vec::new(),
    })
}

/// Classify a `TrustError` for the recorded audit entry. Response status
/// and body come from `crate::error::response_body`, the same function
/// the `IntoResponse` impl uses, so `/proxy` and every other route agree
/// on what each error looks like on the wire.
fn error_to_outcome(err: TrustError) -> ProxyOutcome {
    let reason = err.to_string();
    let (decision, signals) = match &err {
        TrustError::MalformedBody(_) => (RecordedEffect::Deny, vec![]),
        TrustError::HardBlocked { .. } => (RecordedEffect::Deny, vec![SignalKind::Sigtrust]),
        TrustError::WarningWithoutOverride { .. } => (RecordedEffect::RequireApproval, vec![]),
        TrustError::BackendUnavailable(_) => (RecordedEffect::Deny, vec![]),
        TrustError::BackendTimeout => (RecordedEffect::Warn, vec![SignalKind::Sigbudget]),
        TrustError::BackendError { .. } => (RecordedEffect::Warn, vec![]),
        TrustError::Internal(_) => (RecordedEffect::Deny, vec![]),
    };

    let (status, body_json) = crate::error::response_body(&err);
    let body = serde_json::to_vec(&body_json).unwrap_or_else(|_| b"{}".to_vec());

    ProxyOutcome {
        status,
        body,
        quarantined: false,
        decision,
        reason,
        signals,
    }
}
