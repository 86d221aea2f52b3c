// breaker.rs — CircuitBreaker: CLOSED/OPEN/HALF_OPEN with an atomic CAS
// fast path (spec §4.7, spec §5 "no locks in fast path").
//
// State transitions are lazy: OPEN only flips to HALF_OPEN the next time
// `allow_call` is polled after `reset_timeout_seconds` has elapsed, not on
// a background timer. `created_at` anchors a monotonic millisecond clock
// so the open-timestamp can live in an `AtomicU64` instead of a `Mutex`.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::CircuitOpenError;

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout_seconds: u64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_seconds: 30,
            half_open_max_calls: 3,
        }
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    created_at: Instant,
    state: AtomicU8,
    failure_count: AtomicU32,
    half_open_calls: AtomicU32,
    half_open_successes: AtomicU32,
    opened_at_millis: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            created_at: Instant::now(),
            state: AtomicU8::new(CLOSED),
            failure_count: AtomicU32::new(0),
            half_open_calls: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
        }
    }

    /// A point-in-time snapshot. Does not itself perform the OPEN → HALF_OPEN
    /// timeout transition — only `allow_call` does, since that's the only
    /// path that needs the transition to actually happen.
    pub fn state(&self) -> CircuitState {
        match self.state.load(Ordering::Acquire) {
            CLOSED => CircuitState::Closed,
            OPEN => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }

    fn elapsed_millis(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    /// The fast path every call checks before proceeding. No locks: state
    /// is a single atomic load, with a CAS only on the (rare) transition
    /// edges.
    pub fn allow_call(&self) -> Result<(), CircuitOpenError> {
        loop {
            match self.state.load(Ordering::Acquire) {
                CLOSED => return Ok(()),
                OPEN => {
                    let opened_at = self.opened_at_millis.load(Ordering::Acquire);
                    let timeout_millis = self.config.reset_timeout_seconds.saturating_mul(1000);
                    let elapsed = self.elapsed_millis().saturating_sub(opened_at);
                    if elapsed >= timeout_millis {
                        if self
                            .state
                            .compare_exchange(OPEN, HALF_OPEN, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                        {
                            self.half_open_calls.store(0, Ordering::Release);
                            self.half_open_successes.store(0, Ordering::Release);
                        }
                        continue;
                    }
                    let retry_after_seconds = (timeout_millis - elapsed).div_ceil(1000);
                    return Err(CircuitOpenError { retry_after_seconds });
                }
                _ => {
                    let calls = self.half_open_calls.fetch_add(1, Ordering::AcqRel) + 1;
                    if calls > self.config.half_open_max_calls {
                        self.half_open_calls.fetch_sub(1, Ordering::AcqRel);
                        return Err(CircuitOpenError { retry_after_seconds: 1 });
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Record a successful call. In HALF_OPEN, enough successes close the
    /// circuit; in CLOSED it resets the failure counter.
    pub fn record_success(&self) {
        match self.state.load(Ordering::Acquire) {
            CLOSED => self.failure_count.store(0, Ordering::Release),
            HALF_OPEN => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.half_open_max_calls
                    && self
                        .state
                        .compare_exchange(HALF_OPEN, CLOSED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                {
                    self.failure_count.store(0, Ordering::Release);
                    self.half_open_calls.store(0, Ordering::Release);
                    self.half_open_successes.store(0, Ordering::Release);
                    tracing::debug!("circuit closed after successful half-open probes");
                }
            }
            _ => {}
        }
    }

    /// Record a failed call. In CLOSED, trips OPEN once `failure_threshold`
    /// is reached; in HALF_OPEN, any failure reopens immediately.
    pub fn record_failure(&self) {
        match self.state.load(Ordering::Acquire) {
            CLOSED => {
                let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold
                    && self
                        .state
                        .compare_exchange(CLOSED, OPEN, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                {
                    self.mark_opened_now();
                    tracing::warn!(failures, "circuit tripped open");
                }
            }
            HALF_OPEN => {
                if self
                    .state
                    .compare_exchange(HALF_OPEN, OPEN, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.mark_opened_now();
                    tracing::warn!("half-open probe failed; circuit reopened");
                }
            }
            _ => {}
        }
    }

    fn mark_opened_now(&self) {
        self.opened_at_millis.store(self.elapsed_millis(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn config(threshold: u32, timeout_secs: u64, half_open_calls: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            reset_timeout_seconds: timeout_secs,
            half_open_max_calls: half_open_calls,
        }
    }

    #[test]
    fn starts_closed_and_allows_calls() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_call().is_ok());
    }

    #[test]
    fn trips_open_after_threshold_failures() {
        let breaker = CircuitBreaker::new(config(3, 60, 2));
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.allow_call().is_err());
    }

    #[test]
    fn success_resets_failure_count_while_closed() {
        let breaker = CircuitBreaker::new(config(3, 60, 2));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn transitions_to_half_open_after_timeout() {
        let breaker = CircuitBreaker::new(config(1, 0, 2));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_call().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_limits_concurrent_probe_calls() {
        let breaker = CircuitBreaker::new(config(1, 0, 1));
        breaker.record_failure();
        thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_call().is_ok());
        assert!(breaker.allow_call().is_err());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(config(1, 0, 2));
        breaker.record_failure();
        thread::sleep(Duration::from_millis(5));
        breaker.allow_call().unwrap();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_enough_successes_closes_circuit() {
        let breaker = CircuitBreaker::new(config(1, 0, 2));
        breaker.record_failure();
        thread::sleep(Duration::from_millis(5));
        breaker.allow_call().unwrap();
        breaker.record_success();
        breaker.allow_call().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn retry_after_reflects_remaining_timeout() {
        let breaker = CircuitBreaker::new(config(1, 30, 2));
        breaker.record_failure();
        let err = breaker.allow_call().unwrap_err();
        assert!(err.retry_after_seconds > 0 && err.retry_after_seconds <= 30);
    }
}
