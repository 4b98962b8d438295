//! Atomic call statistics shared across the composite backend's strategies.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// The circuit-breaker state, or the equivalent notion for the other
/// strategies (Health Check reuses [`CircuitState::Closed`]/[`CircuitState::Open`]
/// for "primary"/"fallback"; Fail-Fast never moves off [`CircuitState::Closed`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Traffic routes to primary.
    Closed = 0,
    /// Traffic routes to fallback.
    Open = 1,
    /// A single probe routes to primary; the rest route to fallback.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Lock-free call statistics, updated after every routed attempt.
#[derive(Default)]
pub(crate) struct StatsInner {
    pub(crate) switches_to_primary: AtomicU64,
    pub(crate) switches_to_fallback: AtomicU64,
    pub(crate) primary_calls: AtomicU64,
    pub(crate) fallback_calls: AtomicU64,
    pub(crate) primary_failures: AtomicU64,
    pub(crate) fallback_failures: AtomicU64,
    pub(crate) consecutive_failures: AtomicU32,
    pub(crate) state: AtomicU8,
    pub(crate) last_failure_ts: Mutex<Option<Instant>>,
    pub(crate) last_recovery_attempt_ts: Mutex<Option<Instant>>,
}

/// A point-in-time snapshot of [`StatsInner`], returned by
/// [`crate::CompositeBackend::get_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeStats {
    pub switches_to_primary: u64,
    pub switches_to_fallback: u64,
    pub primary_calls: u64,
    pub fallback_calls: u64,
    pub primary_failures: u64,
    pub fallback_failures: u64,
    pub consecutive_failures: u32,
    pub circuit_state: CircuitState,
    pub last_failure_ts: Option<Instant>,
    pub last_recovery_attempt_ts: Option<Instant>,
}

impl StatsInner {
    pub(crate) fn snapshot(&self) -> CompositeStats {
        CompositeStats {
            switches_to_primary: self.switches_to_primary.load(Ordering::Relaxed),
            switches_to_fallback: self.switches_to_fallback.load(Ordering::Relaxed),
            primary_calls: self.primary_calls.load(Ordering::Relaxed),
            fallback_calls: self.fallback_calls.load(Ordering::Relaxed),
            primary_failures: self.primary_failures.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            circuit_state: CircuitState::from_u8(self.state.load(Ordering::Relaxed)),
            last_failure_ts: *self.last_failure_ts.lock().unwrap(),
            last_recovery_attempt_ts: *self.last_recovery_attempt_ts.lock().unwrap(),
        }
    }
}
