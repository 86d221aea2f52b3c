// kernel.rs — Kernel: owns and wires K1-K7 in the dependency order from
// spec §2 (primitives -> K3/K2 -> K1 -> K4/K5/K7 -> K6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use agentos_audit::FlightRecorder;
use agentos_breaker::{CircuitBreaker, CircuitBreakerConfig};
use agentos_memory::MemoryStore;
use agentos_policy::{PolicyDecision, PolicyEngine, PolicyTables};
use agentos_primitives::ExecutionRequest;
use agentos_sandbox::{ImportGuard, Sandbox, SandboxError};
use agentos_signal::SignalDispatcher;

use crate::config::KernelConfig;
use crate::error::KernelError;

/// The governance kernel: submits requests through the policy engine,
/// executes accepted code through the sandbox, and mediates memory
/// reads/writes through the memory guard. All three share one hash-chained
/// flight recorder and one signal dispatcher.
pub struct Kernel {
    policy: PolicyEngine,
    sandbox: Sandbox,
    memory: MemoryStore,
    signals: SignalDispatcher,
    recorder: Arc<Mutex<FlightRecorder>>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl Kernel {
    /// Open (or create) the kernel's on-disk state at `state_root` and
    /// load its policy document.
    pub fn open(state_root: impl AsRef<std::path::Path>) -> Result<Self, KernelError> {
        let config = KernelConfig::load(state_root)?;
        Self::from_config(config)
    }

    pub fn from_config(config: KernelConfig) -> Result<Self, KernelError> {
        let recorder_dir = config.state_root.join("recorder");
        let recorder = Arc::new(Mutex::new(FlightRecorder::open(recorder_dir)?));

        let signals = SignalDispatcher::new();
        {
            let recorder = Arc::clone(&recorder);
            signals.set_flush_hook(move |agent_id| {
                if let Ok(mut recorder) = recorder.lock() {
                    if let Err(e) = recorder.flush() {
                        tracing::error!(agent_id = %agent_id, error = %e, "flight recorder flush on SIGTERM failed");
                    }
                }
            });
        }
        let tables = PolicyTables::from_config(config.policy);
        let policy = PolicyEngine::new(tables, Arc::clone(&recorder), Some(signals.clone()));
        let sandbox = Sandbox::new(config.sandbox, Some(signals.clone()));
        let memory = MemoryStore::new(config.state_root.join("memory"))?;

        Ok(Self {
            policy,
            sandbox,
            memory,
            signals,
            recorder,
            breakers: Mutex::new(HashMap::new()),
        })
    }

    /// Submit a request for evaluation (spec §2 control flow entry point).
    /// Registers the agent with the signal dispatcher on first contact.
    pub fn submit(&self, request: &ExecutionRequest, role: &str) -> PolicyDecision {
        self.signals.register_agent(request.agent_id.clone());
        self.policy.evaluate(request, role)
    }

    /// Run `f` inside the sandbox, recording the outcome alongside policy
    /// decisions in the same flight recorder. Holds a concurrency guard
    /// from `role`'s quota for the full duration of `f`, so
    /// `max_concurrent_executions` bounds actual overlapping tool
    /// execution and not just the decision step that preceded it.
    pub fn execute_sandboxed<F, T>(
        &self,
        agent_id: &str,
        role: &str,
        code: &str,
        f: F,
    ) -> Result<T, KernelError>
    where
        F: FnOnce(&ImportGuard) -> Result<T, SandboxError> + std::panic::UnwindSafe,
    {
        self.signals.register_agent(agent_id);
        let max_concurrent = self.policy.quota_for(role).max_concurrent_executions;
        let _guard = self
            .policy
            .quotas()
            .acquire_execution_guard(agent_id, max_concurrent)
            .map_err(KernelError::QuotaExceeded)?;
        match self.sandbox.execute(agent_id, code, f) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.record_sandbox_violation(agent_id, &err);
                Err(KernelError::Sandbox(err))
            }
        }
    }

    fn record_sandbox_violation(&self, agent_id: &str, err: &SandboxError) {
        use agentos_audit::{AuditEntry, RecordedEffect};
        use agentos_audit::hasher;
        use agentos_primitives::ActionType;

        let entry = AuditEntry::draft(
            agent_id,
            ActionType::CodeExecution,
            "sandbox",
            hasher::hash_str(&err.to_string()),
            RecordedEffect::Deny,
            err.to_string(),
            vec![],
        );
        if let Ok(mut recorder) = self.recorder.lock() {
            if let Err(e) = recorder.append(entry) {
                tracing::error!(error = %e, "failed to record sandbox violation");
            }
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn signals(&self) -> &SignalDispatcher {
        &self.signals
    }

    /// Look up (creating with default parameters if absent) the circuit
    /// breaker guarding a named outbound dependency (spec §4.7). The
    /// table lock is held only for the lookup; callers get their own
    /// `Arc` and use the breaker's lock-free fast path from there.
    pub fn breaker_for(&self, dependency: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().expect("breaker table lock poisoned");
        Arc::clone(
            breakers
                .entry(dependency.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()))),
        )
    }

    pub fn recorder(&self) -> &Arc<Mutex<FlightRecorder>> {
        &self.recorder
    }
}
