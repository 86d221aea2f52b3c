// state.rs — Shared sidecar state handed to every axum handler.

use std::sync::Mutex;
use std::time::Duration;

use agentos_audit::FlightRecorder;
use agentos_breaker::{CircuitBreaker, CircuitBreakerConfig};
use agentos_signal::SignalDispatcher;

use crate::config::TrustConfig;
use crate::manifest::CapabilityManifest;
use crate::quarantine::QuarantineStore;

pub struct SidecarState {
    pub manifest: CapabilityManifest,
    pub backend_url: String,
    pub scan_email_phone: bool,
    pub recorder: Mutex<FlightRecorder>,
    pub breaker: CircuitBreaker,
    pub quarantine: QuarantineStore,
    pub signals: SignalDispatcher,
    pub http: reqwest::Client,
}

impl SidecarState {
    pub fn new(config: TrustConfig, recorder: FlightRecorder) -> Self {
        let signals = SignalDispatcher::new();
        signals.register_agent(config.manifest.agent_id.clone());

        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.failure_threshold,
            reset_timeout_seconds: config.reset_timeout_seconds,
            half_open_max_calls: config.half_open_max_calls,
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.backend_timeout_ms))
            .build()
            .expect("reqwest client builds with static config");

        Self {
            backend_url: config.backend_url,
            scan_email_phone: config.scan_email_phone,
            manifest: config.manifest,
            recorder: Mutex::new(recorder),
            breaker,
            quarantine: QuarantineStore::new(),
            signals,
            http,
        }
    }
}
