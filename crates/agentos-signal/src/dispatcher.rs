// dispatcher.rs — SignalDispatcher: per-agent FIFO delivery with masking.
//
// Each registered agent owns two FIFO queues (maskable, unmaskable).
// Unmaskable signals (SIGKILL, SIGPOLICY, SIGTRUST) always jump ahead of
// maskable ones and are delivered synchronously regardless of any active
// mask. A `std::sync::Mutex` guards the per-agent table directly: signal
// delivery never suspends (spec §5), so there is no reason to reach for an
// async-aware lock here.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use agentos_primitives::SignalKind;

use crate::error::SignalError;
use crate::signal::{AgentState, Signal};

type Handler = Box<dyn Fn(&Signal) + Send + Sync>;

struct AgentRecord {
    state: AgentState,
    maskable_queue: VecDeque<Signal>,
    masked: HashSet<SignalKind>,
    handlers: HashMap<SignalKind, Handler>,
}

impl AgentRecord {
    fn new() -> Self {
        Self {
            state: AgentState::Running,
            maskable_queue: VecDeque::new(),
            masked: HashSet::new(),
            handlers: HashMap::new(),
        }
    }
}

type FlushHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct SignalDispatcher {
    agents: Arc<Mutex<HashMap<String, AgentRecord>>>,
    flush_hook: Arc<Mutex<Option<FlushHook>>>,
}

impl Default for SignalDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
            flush_hook: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the callback run before a graceful `SIGTERM` transitions an
    /// agent to `Terminated` (spec §4.2: SIGTERM flushes, SIGKILL doesn't).
    /// Shared across clones, since the dispatcher itself is cloned freely.
    pub fn set_flush_hook(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.flush_hook.lock().expect("signal dispatcher lock poisoned") = Some(Arc::new(hook));
    }

    fn run_flush_hook(&self, agent_id: &str) {
        let hook = self.flush_hook.lock().expect("signal dispatcher lock poisoned").clone();
        if let Some(hook) = hook {
            hook(agent_id);
        }
    }

    pub fn register_agent(&self, agent_id: impl Into<String>) {
        let mut agents = self.agents.lock().expect("signal dispatcher lock poisoned");
        agents.entry(agent_id.into()).or_insert_with(AgentRecord::new);
    }

    pub fn state_of(&self, agent_id: &str) -> Result<AgentState, SignalError> {
        let agents = self.agents.lock().expect("signal dispatcher lock poisoned");
        agents
            .get(agent_id)
            .map(|r| r.state)
            .ok_or_else(|| SignalError::UnknownAgent(agent_id.to_string()))
    }

    /// Register a handler for a maskable signal kind. Unmaskable kinds
    /// (SIGKILL, SIGPOLICY, SIGTRUST) cannot be intercepted — registering a
    /// handler for one is a silent no-op, matching "cannot be caught".
    pub fn on(&self, agent_id: &str, kind: SignalKind, handler: Handler) {
        if kind.is_unmaskable() {
            return;
        }
        let mut agents = self.agents.lock().expect("signal dispatcher lock poisoned");
        if let Some(record) = agents.get_mut(agent_id) {
            record.handlers.insert(kind, handler);
        }
    }

    /// Send a signal to an agent. Unmaskable signals are always delivered
    /// synchronously. Maskable signals are queued if the kind is currently
    /// masked for this agent, otherwise delivered immediately.
    pub fn send(&self, agent_id: &str, signal: Signal) -> Result<(), SignalError> {
        let mut agents = self.agents.lock().expect("signal dispatcher lock poisoned");
        let record = agents
            .get_mut(agent_id)
            .ok_or_else(|| SignalError::UnknownAgent(agent_id.to_string()))?;

        if record.state.is_terminated() {
            tracing::debug!(agent_id, kind = %signal.kind, "duplicate signal after termination discarded");
            return Ok(());
        }

        if signal.kind.is_unmaskable() {
            self.deliver(agent_id, record, signal);
            return Ok(());
        }

        if record.masked.contains(&signal.kind) {
            record.maskable_queue.push_back(signal);
        } else {
            self.deliver(agent_id, record, signal);
        }
        Ok(())
    }

    /// Apply the signal's state transition and, for signals with a handler
    /// or default behaviour, run it — catching panics for maskable kinds so
    /// a broken handler cannot take the dispatcher thread down with it.
    /// SIGTERM runs the flush hook before the state transition; SIGKILL
    /// terminates immediately with no flush (spec §4.2).
    fn deliver(&self, agent_id: &str, record: &mut AgentRecord, signal: Signal) {
        match signal.kind {
            SignalKind::Sigstop | SignalKind::Sigint => {
                record.state = AgentState::Stopped;
            }
            SignalKind::Sigcont => {
                if record.state == AgentState::Stopped {
                    record.state = AgentState::Running;
                }
            }
            SignalKind::Sigterm => {
                self.run_flush_hook(agent_id);
                record.state = AgentState::Terminated;
            }
            SignalKind::Sigkill => {
                record.state = AgentState::Terminated;
            }
            SignalKind::Sigpolicy | SignalKind::Sigtrust => {
                // Escalates to SIGKILL immediately.
                record.state = AgentState::Terminated;
            }
            SignalKind::Sigbudget | SignalKind::Sigloop | SignalKind::Sigdrift => {
                if !record.handlers.contains_key(&signal.kind) {
                    // default handler: issue SIGSTOP
                    record.state = AgentState::Stopped;
                }
            }
            SignalKind::Sigusr1 | SignalKind::Sigusr2 => {}
        }

        if signal.kind.is_unmaskable() {
            // No custom handler can intercept an unmaskable signal.
            return;
        }

        if let Some(handler) = record.handlers.get(&signal.kind) {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&signal)));
            if outcome.is_err() {
                tracing::error!(kind = %signal.kind, "signal handler panicked; agent continues");
            }
        }
    }

    /// Mask the given signal kinds for `agent_id` until the returned guard
    /// is dropped, then deliver everything queued for those kinds in FIFO
    /// order. Unmaskable kinds passed here are ignored — they are never
    /// affected by masking.
    pub fn mask(&self, agent_id: impl Into<String>, kinds: &[SignalKind]) -> MaskGuard {
        let agent_id = agent_id.into();
        let maskable: Vec<SignalKind> = kinds.iter().copied().filter(|k| !k.is_unmaskable()).collect();
        {
            let mut agents = self.agents.lock().expect("signal dispatcher lock poisoned");
            if let Some(record) = agents.get_mut(&agent_id) {
                record.masked.extend(maskable.iter().copied());
            }
        }
        MaskGuard {
            dispatcher: self.clone(),
            agent_id,
            kinds: maskable,
        }
    }

    fn unmask_and_flush(&self, agent_id: &str, kinds: &[SignalKind]) {
        let mut agents = self.agents.lock().expect("signal dispatcher lock poisoned");
        let Some(record) = agents.get_mut(agent_id) else {
            return;
        };
        for kind in kinds {
            record.masked.remove(kind);
        }
        if record.state.is_terminated() {
            record.maskable_queue.clear();
            return;
        }
        let mut remaining = VecDeque::new();
        let queued: Vec<Signal> = record.maskable_queue.drain(..).collect();
        for signal in queued {
            if kinds.contains(&signal.kind) && !record.masked.contains(&signal.kind) {
                self.deliver(agent_id, record, signal);
                if record.state.is_terminated() {
                    remaining.clear();
                    break;
                }
            } else {
                remaining.push_back(signal);
            }
        }
        record.maskable_queue = remaining;
    }
}

/// RAII scope guard returned by [`SignalDispatcher::mask`]. On drop, unmasks
/// its kinds and flushes anything queued for them, in FIFO order.
pub struct MaskGuard {
    dispatcher: SignalDispatcher,
    agent_id: String,
    kinds: Vec<SignalKind>,
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        self.dispatcher.unmask_and_flush(&self.agent_id, &self.kinds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sigstop_then_sigcont_round_trips_state() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigstop, "test")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Stopped);
        d.send("a1", Signal::new(SignalKind::Sigcont, "test")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Running);
    }

    #[test]
    fn sigcont_is_noop_when_already_running() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigcont, "test")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Running);
    }

    #[test]
    fn sigkill_terminates_unconditionally() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigstop, "test")).unwrap();
        d.send("a1", Signal::new(SignalKind::Sigkill, "test")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
    }

    #[test]
    fn sigpolicy_escalates_to_termination() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigpolicy, "policy")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
    }

    #[test]
    fn sigterm_runs_flush_hook_before_terminating() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        d.set_flush_hook(move |agent_id| {
            assert_eq!(agent_id, "a1");
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        d.send("a1", Signal::new(SignalKind::Sigterm, "test")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
    }

    #[test]
    fn sigkill_does_not_run_flush_hook() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        d.set_flush_hook(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        d.send("a1", Signal::new(SignalKind::Sigkill, "test")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
    }

    #[test]
    fn duplicate_terminal_signal_is_discarded_not_errored() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigkill, "test")).unwrap();
        let result = d.send("a1", Signal::new(SignalKind::Sigterm, "test"));
        assert!(result.is_ok());
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
    }

    #[test]
    fn unmaskable_signal_bypasses_mask_scope() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        {
            let _guard = d.mask("a1", &[SignalKind::Sigstop, SignalKind::Sigkill]);
            // SIGKILL passed to mask() is filtered out as unmaskable — still
            // delivered synchronously even "inside" the guard's scope.
            d.send("a1", Signal::new(SignalKind::Sigkill, "test")).unwrap();
            assert_eq!(d.state_of("a1").unwrap(), AgentState::Terminated);
        }
    }

    #[test]
    fn maskable_signal_is_queued_then_flushed_on_guard_drop() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        {
            let _guard = d.mask("a1", &[SignalKind::Sigstop]);
            d.send("a1", Signal::new(SignalKind::Sigstop, "test")).unwrap();
            // still running: the signal is queued, not yet delivered.
            assert_eq!(d.state_of("a1").unwrap(), AgentState::Running);
        }
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Stopped);
    }

    #[test]
    fn default_handler_for_sigbudget_issues_sigstop() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.send("a1", Signal::new(SignalKind::Sigbudget, "budget")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Stopped);
    }

    #[test]
    fn custom_handler_for_sigbudget_suppresses_default_transition() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        d.on("a1", SignalKind::Sigbudget, Box::new(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        d.send("a1", Signal::new(SignalKind::Sigbudget, "budget")).unwrap();
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Running);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_is_caught_and_agent_continues() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        d.on("a1", SignalKind::Sigusr1, Box::new(|_| panic!("boom")));
        let result = d.send("a1", Signal::new(SignalKind::Sigusr1, "test"));
        assert!(result.is_ok());
        assert_eq!(d.state_of("a1").unwrap(), AgentState::Running);
    }

    #[test]
    fn unknown_agent_returns_error() {
        let d = SignalDispatcher::new();
        let result = d.send("ghost", Signal::new(SignalKind::Sigstop, "test"));
        assert_eq!(result, Err(SignalError::UnknownAgent("ghost".to_string())));
    }

    #[test]
    fn handler_registration_for_unmaskable_kind_is_ignored() {
        let d = SignalDispatcher::new();
        d.register_agent("a1");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        d.on("a1", SignalKind::Sigkill, Box::new(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        d.send("a1", Signal::new(SignalKind::Sigkill, "test")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
