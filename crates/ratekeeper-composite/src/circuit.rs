//! The Circuit Breaker switching strategy's state machine.
//!
//! Unlike a failure-*rate* circuit breaker over a sliding window, this one
//! trips on *consecutive* failures, which is simpler and a better fit for
//! routing a rate limiter's own backend calls rather than an arbitrary
//! downstream service.

use crate::events::{ActiveBackend, CompositeBackendEvent};
use crate::stats::{CircuitState, StatsInner};
use ratekeeper_core::EventListeners;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) struct Circuit {
    state: CircuitState,
    stats: Arc<StatsInner>,
    consecutive_failures: u32,
    last_state_change: Instant,
    /// Reserves the single probe slot while `HalfOpen`; cleared once that
    /// probe resolves, so concurrent requests don't all probe primary.
    probe_in_flight: bool,
}

impl Circuit {
    pub(crate) fn new(stats: Arc<StatsInner>) -> Self {
        Self {
            state: CircuitState::Closed,
            stats,
            consecutive_failures: 0,
            last_state_change: Instant::now(),
            probe_in_flight: false,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns `true` if this call should be attempted against primary.
    pub(crate) fn should_try_primary(
        &mut self,
        recovery_timeout: Duration,
        backend_name: &str,
        event_listeners: &EventListeners<CompositeBackendEvent>,
    ) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.last_state_change.elapsed() >= recovery_timeout {
                    self.transition_to(CircuitState::HalfOpen, backend_name, event_listeners);
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Administratively forces the circuit into `state`, bypassing the
    /// failure-count transition rules. Used by `force_switch_to_primary`/
    /// `force_switch_to_fallback`.
    pub(crate) fn force_to(
        &mut self,
        state: CircuitState,
        backend_name: &str,
        event_listeners: &EventListeners<CompositeBackendEvent>,
    ) {
        self.consecutive_failures = 0;
        self.stats.consecutive_failures.store(0, Ordering::Relaxed);
        self.probe_in_flight = false;
        self.transition_to(state, backend_name, event_listeners);
    }

    pub(crate) fn record_primary_success(
        &mut self,
        backend_name: &str,
        event_listeners: &EventListeners<CompositeBackendEvent>,
    ) {
        self.consecutive_failures = 0;
        self.stats.consecutive_failures.store(0, Ordering::Relaxed);
        if self.state == CircuitState::HalfOpen {
            self.probe_in_flight = false;
            self.stats.switches_to_primary.fetch_add(1, Ordering::Relaxed);
            self.transition_to(CircuitState::Closed, backend_name, event_listeners);
        }
    }

    pub(crate) fn record_primary_failure(
        &mut self,
        failure_threshold: u32,
        backend_name: &str,
        event_listeners: &EventListeners<CompositeBackendEvent>,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                self.stats
                    .consecutive_failures
                    .store(self.consecutive_failures, Ordering::Relaxed);
                if self.consecutive_failures >= failure_threshold {
                    self.stats.switches_to_fallback.fetch_add(1, Ordering::Relaxed);
                    self.transition_to(CircuitState::Open, backend_name, event_listeners);
                }
            }
            CircuitState::HalfOpen => {
                self.probe_in_flight = false;
                self.transition_to(CircuitState::Open, backend_name, event_listeners);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(
        &mut self,
        state: CircuitState,
        backend_name: &str,
        event_listeners: &EventListeners<CompositeBackendEvent>,
    ) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.last_state_change = Instant::now();
        self.stats.state.store(state as u8, Ordering::Release);

        match state {
            CircuitState::Open => {
                *self.stats.last_failure_ts.lock().unwrap() = Some(self.last_state_change);
            }
            CircuitState::HalfOpen => {
                *self.stats.last_recovery_attempt_ts.lock().unwrap() = Some(self.last_state_change);
            }
            CircuitState::Closed => {}
        }

        #[cfg(feature = "tracing")]
        tracing::info!(backend = backend_name, ?state, "ratekeeper composite circuit transition");

        #[cfg(feature = "metrics")]
        metrics::gauge!("ratekeeper_composite_circuit_state", "backend" => backend_name.to_string())
            .set(state as u8 as f64);

        let active = match state {
            CircuitState::Closed | CircuitState::HalfOpen => ActiveBackend::Primary,
            CircuitState::Open => ActiveBackend::Fallback,
        };
        event_listeners.emit(&CompositeBackendEvent::SwitchedTo {
            backend_name: backend_name.to_string(),
            timestamp: Instant::now(),
            active,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit() -> Circuit {
        Circuit::new(Arc::new(StatsInner::default()))
    }

    #[test]
    fn opens_after_reaching_the_failure_threshold() {
        let mut circuit = circuit();
        let listeners = EventListeners::new();
        for _ in 0..4 {
            circuit.record_primary_failure(5, "t", &listeners);
            assert_eq!(circuit.state(), CircuitState::Closed);
        }
        circuit.record_primary_failure(5, "t", &listeners);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_the_consecutive_failure_count() {
        let mut circuit = circuit();
        let listeners = EventListeners::new();
        circuit.record_primary_failure(5, "t", &listeners);
        circuit.record_primary_success("t", &listeners);
        for _ in 0..4 {
            circuit.record_primary_failure(5, "t", &listeners);
        }
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_reserves_a_single_probe_slot() {
        let mut circuit = circuit();
        let listeners = EventListeners::new();
        circuit.state = CircuitState::Open;
        circuit.last_state_change = Instant::now() - Duration::from_secs(120);

        assert!(circuit.should_try_primary(Duration::from_secs(60), "t", &listeners));
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        assert!(!circuit.should_try_primary(Duration::from_secs(60), "t", &listeners));
    }

    #[test]
    fn half_open_probe_success_closes_the_circuit() {
        let mut circuit = circuit();
        let listeners = EventListeners::new();
        circuit.state = CircuitState::HalfOpen;
        circuit.probe_in_flight = true;
        circuit.record_primary_success("t", &listeners);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_the_circuit() {
        let mut circuit = circuit();
        let listeners = EventListeners::new();
        circuit.state = CircuitState::HalfOpen;
        circuit.probe_in_flight = true;
        circuit.record_primary_failure(5, "t", &listeners);
        assert_eq!(circuit.state(), CircuitState::Open);
    }
}
