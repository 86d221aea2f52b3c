// quota.rs — Rolling-window quota and concurrency tracking (spec §4.1 step 6).
//
// Rolling windows by minute and hour, plus a concurrent-inflight counter,
// kept per agent behind a `Mutex` — evaluation is synchronous and must
// stay well under the engine's 5ms p99 budget, so this never suspends.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::rules::ResourceQuota;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaViolation {
    PerMinuteExceeded,
    PerHourExceeded,
    ConcurrentExceeded,
}

#[derive(Default)]
struct AgentQuotaState {
    minute_window: VecDeque<DateTime<Utc>>,
    hour_window: VecDeque<DateTime<Utc>>,
    concurrent: u32,
}

#[derive(Clone)]
pub struct QuotaTracker {
    agents: Arc<Mutex<HashMap<String, AgentQuotaState>>>,
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check the quota and, if it admits the request, record it and return
    /// a `ConcurrencyGuard` the caller holds for the lifetime of the
    /// in-flight execution.
    pub fn check_and_record(
        &self,
        agent_id: &str,
        quota: &ResourceQuota,
        now: DateTime<Utc>,
    ) -> Result<ConcurrencyGuard, QuotaViolation> {
        let mut agents = self.agents.lock().expect("quota tracker lock poisoned");
        let state = agents.entry(agent_id.to_string()).or_default();

        prune(&mut state.minute_window, now, ChronoDuration::minutes(1));
        prune(&mut state.hour_window, now, ChronoDuration::hours(1));

        if let Some(max) = quota.max_requests_per_minute {
            if state.minute_window.len() as u32 >= max {
                return Err(QuotaViolation::PerMinuteExceeded);
            }
        }
        if let Some(max) = quota.max_requests_per_hour {
            if state.hour_window.len() as u32 >= max {
                return Err(QuotaViolation::PerHourExceeded);
            }
        }
        if let Some(max) = quota.max_concurrent_executions {
            if state.concurrent >= max {
                return Err(QuotaViolation::ConcurrentExceeded);
            }
        }

        state.minute_window.push_back(now);
        state.hour_window.push_back(now);
        state.concurrent += 1;

        Ok(ConcurrencyGuard {
            agents: self.agents.clone(),
            agent_id: agent_id.to_string(),
        })
    }

    /// Acquire a concurrency slot for the duration of an actual tool
    /// execution, independent of the per-minute/per-hour decision quota
    /// already consumed at evaluation time. Callers hold the returned
    /// guard across the execution, not just the decision.
    pub fn acquire_execution_guard(
        &self,
        agent_id: &str,
        max_concurrent: Option<u32>,
    ) -> Result<ConcurrencyGuard, QuotaViolation> {
        let mut agents = self.agents.lock().expect("quota tracker lock poisoned");
        let state = agents.entry(agent_id.to_string()).or_default();

        if let Some(max) = max_concurrent {
            if state.concurrent >= max {
                return Err(QuotaViolation::ConcurrentExceeded);
            }
        }
        state.concurrent += 1;

        Ok(ConcurrencyGuard {
            agents: self.agents.clone(),
            agent_id: agent_id.to_string(),
        })
    }
}

fn prune(window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, span: ChronoDuration) {
    while let Some(front) = window.front() {
        if now - *front > span {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Decrements the concurrent-inflight counter for its agent on drop.
pub struct ConcurrencyGuard {
    agents: Arc<Mutex<HashMap<String, AgentQuotaState>>>,
    agent_id: String,
}

impl Drop for ConcurrencyGuard {
    fn drop(&mut self) {
        let mut agents = self.agents.lock().expect("quota tracker lock poisoned");
        if let Some(state) = agents.get_mut(&self.agent_id) {
            state.concurrent = state.concurrent.saturating_sub(1);
        }
    }
}
