use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-analyzer breaker tuning, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_success_threshold: u32,
}

impl BreakerConfig {
    pub fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        half_open_success_threshold: u32,
    ) -> Result<Self, String> {
        if failure_threshold == 0 {
            return Err("failure_threshold must be > 0".to_string());
        }
        if recovery_timeout.is_zero() {
            return Err("recovery_timeout must be > 0".to_string());
        }
        if half_open_success_threshold == 0 {
            return Err("half_open_success_threshold must be > 0".to_string());
        }
        Ok(Self {
            failure_threshold,
            recovery_timeout,
            half_open_success_threshold,
        })
    }
}

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time view of a breaker's counters, for `/health`.
#[derive(Serialize, Debug, Clone)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
    pub opened_for_secs: f64,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub half_open_success_threshold: u32,
}

/// One analyzer's breaker. All operations are safe under concurrent calls
/// on the same instance; `allow()` and the OPEN->HALF_OPEN promotion it may
/// perform live in the same critical section (the `opened_at` mutex).
pub struct Breaker {
    name: String,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    half_open_successes: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    config: BreakerConfig,
}

impl Breaker {
    fn new(name: String, config: BreakerConfig) -> Self {
        let breaker = Self {
            name,
            state: AtomicU8::new(STATE_CLOSED),
            consecutive_failures: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            opened_at: Mutex::new(None),
            config,
        };
        breaker.emit_state_gauge(STATE_CLOSED);
        breaker
    }

    /// Publishes the current FSM state as `distributor_breaker_state`
    /// (0=CLOSED 1=OPEN 2=HALF_OPEN) so `/metrics` reflects every transition,
    /// not just what `/health` happens to snapshot.
    fn emit_state_gauge(&self, state: u8) {
        let value = match state {
            STATE_CLOSED => 0.0,
            STATE_OPEN => 1.0,
            _ => 2.0,
        };
        metrics::gauge!("distributor_breaker_state", "analyzer" => self.name.clone()).set(value);
    }

    /// Returns whether a call should be attempted now.
    ///
    /// The state read and the possible OPEN->HALF_OPEN promotion live inside
    /// one critical section (the `opened_at` lock, held for the whole call):
    /// reading `state` outside the lock would let a concurrent promoter
    /// clear `opened_at` between the read and the lock acquisition, making a
    /// stale-OPEN read fall through to `false` even though the breaker is
    /// already HALF_OPEN (which must always allow).
    pub fn allow(&self) -> bool {
        let mut opened_at = self.opened_at.lock().unwrap();
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => match *opened_at {
                Some(at) if at.elapsed() >= self.config.recovery_timeout => {
                    self.state.store(STATE_HALF_OPEN, Ordering::Release);
                    self.half_open_successes.store(0, Ordering::Relaxed);
                    *opened_at = None;
                    self.emit_state_gauge(STATE_HALF_OPEN);
                    tracing::info!(
                        analyzer = %self.name, from = "OPEN", to = "HALF_OPEN",
                        reason = "cooldown elapsed", "breaker transition"
                    );
                    true
                }
                _ => false,
            },
            _ => true,
        }
    }

    pub fn record_success(&self) {
        let state = self.state.load(Ordering::Acquire);
        match state {
            STATE_HALF_OPEN => {
                let count = self.half_open_successes.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= self.config.half_open_success_threshold {
                    self.state.store(STATE_CLOSED, Ordering::Release);
                    self.consecutive_failures.store(0, Ordering::Relaxed);
                    self.half_open_successes.store(0, Ordering::Relaxed);
                    self.emit_state_gauge(STATE_CLOSED);
                    tracing::info!(
                        analyzer = %self.name, from = "HALF_OPEN", to = "CLOSED",
                        reason = "half-open success threshold reached", "breaker transition"
                    );
                }
            }
            STATE_CLOSED => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_failure(&self) {
        tracing::info!(
            analyzer = %self.name, snapshot = ?self.snapshot(), "breaker recorded failure"
        );
        let state = self.state.load(Ordering::Acquire);
        match state {
            STATE_HALF_OPEN => {
                self.trip_open("failure while half-open");
            }
            STATE_CLOSED => {
                let count = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= self.config.failure_threshold {
                    self.trip_open("failure threshold reached");
                }
            }
            _ => {}
        }
    }

    fn trip_open(&self, reason: &str) {
        {
            // Same critical section `allow()` uses, so a concurrent allow()
            // never observes `opened_at` set without `state` also OPEN (or
            // vice versa).
            let mut opened_at = self.opened_at.lock().unwrap();
            *opened_at = Some(Instant::now());
            self.state.store(STATE_OPEN, Ordering::Release);
        }
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.half_open_successes.store(0, Ordering::Relaxed);
        self.emit_state_gauge(STATE_OPEN);
        tracing::warn!(analyzer = %self.name, reason, "breaker opened");
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let opened_at = self.opened_at.lock().unwrap();
        let state = match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => BreakerState::Closed,
            STATE_OPEN => BreakerState::Open,
            _ => BreakerState::HalfOpen,
        };
        let opened_for_secs = match *opened_at {
            Some(at) => at.elapsed().as_secs_f64(),
            None => -1.0,
        };
        BreakerSnapshot {
            name: self.name.clone(),
            state,
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            half_open_successes: self.half_open_successes.load(Ordering::Relaxed),
            opened_for_secs,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs_f64(),
            half_open_success_threshold: self.config.half_open_success_threshold,
        }
    }
}

/// Registry of per-analyzer breakers, built once at startup from the static
/// analyzer list and never resized thereafter.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<Breaker>>,
}

impl BreakerRegistry {
    pub fn new(names: impl IntoIterator<Item = String>, config: BreakerConfig) -> Self {
        let breakers = DashMap::new();
        for name in names {
            breakers.insert(name.clone(), Arc::new(Breaker::new(name, config.clone())));
        }
        Self { breakers }
    }

    fn get(&self, name: &str) -> Arc<Breaker> {
        self.breakers
            .get(name)
            .expect("breaker set is fixed at startup")
            .clone()
    }

    pub fn allow(&self, name: &str) -> bool {
        self.get(name).allow()
    }

    pub fn record_success(&self, name: &str) {
        self.get(name).record_success();
    }

    pub fn record_failure(&self, name: &str) {
        self.get(name).record_failure();
    }

    pub fn snapshot_all(&self) -> std::collections::HashMap<String, BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|e| (e.key().clone(), e.value().snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(failure_threshold: u32, recovery_ms: u64, half_open_success_threshold: u32) -> BreakerConfig {
        BreakerConfig::new(
            failure_threshold,
            Duration::from_millis(recovery_ms),
            half_open_success_threshold,
        )
        .unwrap()
    }

    fn registry(cfg: BreakerConfig) -> BreakerRegistry {
        BreakerRegistry::new(["a".to_string()], cfg)
    }

    #[test]
    fn rejects_non_positive_construction() {
        assert!(BreakerConfig::new(0, Duration::from_secs(1), 1).is_err());
        assert!(BreakerConfig::new(1, Duration::from_secs(0), 1).is_err());
        assert!(BreakerConfig::new(1, Duration::from_secs(1), 0).is_err());
    }

    #[test]
    fn starts_closed() {
        let reg = registry(cfg(3, 1000, 2));
        assert!(reg.allow("a"));
    }

    #[test]
    fn opens_exactly_at_kth_failure() {
        let reg = registry(cfg(3, 1000, 2));
        reg.record_failure("a");
        assert!(reg.allow("a"));
        reg.record_failure("a");
        assert!(reg.allow("a"));
        reg.record_failure("a");
        assert!(!reg.allow("a"));
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let reg = registry(cfg(3, 1000, 2));
        reg.record_failure("a");
        reg.record_failure("a");
        reg.record_success("a");
        reg.record_failure("a");
        reg.record_failure("a");
        assert!(reg.allow("a"));
    }

    #[test]
    fn half_open_after_cooldown_then_success_closes() {
        let reg = registry(cfg(1, 10, 2));
        reg.record_failure("a");
        assert!(!reg.allow("a"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(reg.allow("a")); // promotes to HALF_OPEN, first probe allowed
        reg.record_success("a");
        assert!(reg.allow("a")); // still half-open (1/2)
        reg.record_success("a");
        let snap = reg.get("a").snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_and_resets_counters() {
        let reg = registry(cfg(1, 10, 5));
        reg.record_failure("a");
        std::thread::sleep(Duration::from_millis(20));
        assert!(reg.allow("a"));
        reg.record_success("a"); // 1 of 5 half-open successes
        reg.record_failure("a"); // single failure reopens immediately
        let snap = reg.get("a").snapshot();
        assert_eq!(snap.state, BreakerState::Open);
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.half_open_successes, 0);
    }

    #[test]
    fn breaker_denial_is_not_a_recorded_failure() {
        let reg = registry(cfg(1, 3600, 1));
        reg.record_failure("a");
        assert!(!reg.allow("a"));
        let snap = reg.get("a").snapshot();
        // allow() returning false does not itself touch counters again.
        assert_eq!(snap.consecutive_failures, 0); // already reset by trip_open
        assert_eq!(snap.state, BreakerState::Open);
    }

    #[test]
    fn snapshot_opened_for_secs_is_negative_when_never_opened() {
        let reg = registry(cfg(3, 1000, 2));
        assert_eq!(reg.get("a").snapshot().opened_for_secs, -1.0);
    }
}
