//! Per-source circuit breaker with a sliding failure window.
//!
//! Each source key moves through closed → open → half-open independently.
//! Failures older than the window are pruned before every evaluation, so a
//! historical burst never permanently penalizes a source. State is
//! process-local and rebuilds to closed on restart.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

use finfacts_core::BreakerConfig;

/// Circuit state for one source key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// All requests allowed.
    Closed,
    /// All requests rejected until the cooldown elapses.
    Open,
    /// A bounded number of probe requests allowed concurrently.
    HalfOpen,
}

#[derive(Debug)]
struct KeyState {
    state: CircuitState,
    failures: VecDeque<Instant>,
    open_until: Option<Instant>,
    half_open_inflight: u32,
}

impl KeyState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            open_until: None,
            half_open_inflight: 0,
        }
    }
}

/// Keyed circuit breaker shared across all extraction attempts.
///
/// Keys identify sources, not tickers: one flaky source trips for every
/// ticker at once. Thread-safe via `parking_lot::RwLock`; `allow` checks
/// the half-open inflight counter rather than holding a lock across the
/// probe, so probes cannot starve each other.
pub struct SourceBreaker {
    config: BreakerConfig,
    keys: RwLock<HashMap<String, KeyState>>,
}

impl std::fmt::Debug for SourceBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.keys.read();
        f.debug_struct("SourceBreaker")
            .field("config", &self.config)
            .field("tracked_keys", &keys.len())
            .finish()
    }
}

impl SourceBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            keys: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::new(BreakerConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Whether a request to this source may be attempted right now.
    #[must_use]
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut keys = self.keys.write();
        let entry = keys.entry(key.to_string()).or_insert_with(KeyState::new);
        Self::prune(entry, &self.config, now);

        match entry.state {
            CircuitState::Closed => true,
            CircuitState::Open => entry.open_until.map_or(true, |until| now > until),
            CircuitState::HalfOpen => entry.half_open_inflight < self.config.halfopen_max,
        }
    }

    /// Marks the start of an attempt. Transitions open → half-open once the
    /// cooldown has elapsed and counts the probe as inflight.
    pub fn on_attempt_start(&self, key: &str) {
        let now = Instant::now();
        let mut keys = self.keys.write();
        let entry = keys.entry(key.to_string()).or_insert_with(KeyState::new);

        if entry.state == CircuitState::Open
            && entry.open_until.map_or(true, |until| now > until)
        {
            entry.state = CircuitState::HalfOpen;
            entry.open_until = None;
        }
        if entry.state == CircuitState::HalfOpen {
            entry.half_open_inflight += 1;
        }
    }

    /// Marks the end of an attempt, success or failure. Must be paired
    /// with `on_attempt_start` to keep the probe counter bounded.
    pub fn on_attempt_done(&self, key: &str) {
        let mut keys = self.keys.write();
        if let Some(entry) = keys.get_mut(key) {
            if entry.state == CircuitState::HalfOpen {
                entry.half_open_inflight = entry.half_open_inflight.saturating_sub(1);
            }
        }
    }

    /// Records a successful attempt: closes the circuit and clears the
    /// failure history for this key.
    pub fn record_success(&self, key: &str) {
        let mut keys = self.keys.write();
        let entry = keys.entry(key.to_string()).or_insert_with(KeyState::new);
        entry.state = CircuitState::Closed;
        entry.open_until = None;
        entry.half_open_inflight = 0;
        entry.failures.clear();
    }

    /// Records a failed attempt. Opens the circuit once failures within
    /// the sliding window reach the threshold; a half-open probe failure
    /// reopens immediately with a fresh cooldown.
    pub fn record_failure(&self, key: &str) {
        let now = Instant::now();
        let mut keys = self.keys.write();
        let entry = keys.entry(key.to_string()).or_insert_with(KeyState::new);
        Self::prune(entry, &self.config, now);
        entry.failures.push_back(now);

        let probe_failed = entry.state == CircuitState::HalfOpen;
        if probe_failed || entry.failures.len() >= self.config.fail_threshold as usize {
            entry.state = CircuitState::Open;
            entry.open_until = Some(now + self.config.open_for);
        }
    }

    /// Current state for a key (closed for unknown keys).
    #[must_use]
    pub fn state(&self, key: &str) -> CircuitState {
        self.keys
            .read()
            .get(key)
            .map_or(CircuitState::Closed, |entry| entry.state)
    }

    /// Failures currently inside the sliding window.
    #[must_use]
    pub fn failure_count(&self, key: &str) -> usize {
        let now = Instant::now();
        let mut keys = self.keys.write();
        match keys.get_mut(key) {
            Some(entry) => {
                Self::prune(entry, &self.config, now);
                entry.failures.len()
            }
            None => 0,
        }
    }

    fn prune(entry: &mut KeyState, config: &BreakerConfig, now: Instant) {
        while let Some(oldest) = entry.failures.front() {
            if now.duration_since(*oldest) > config.window {
                entry.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
