//! [`CompositeBackend`]: routes between a primary and a fallback backend per
//! the configured [`SwitchingStrategy`].

use crate::circuit::Circuit;
use crate::config::{CompositeBackendConfig, SwitchingStrategy};
use crate::events::CompositeBackendEvent;
use crate::stats::{CircuitState, CompositeStats, StatsInner};
use async_trait::async_trait;
use ratekeeper_core::{Backend, BackendError, Decision};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Fronts a `primary` and `fallback` backend and routes `check_limit` calls
/// between them according to the configured [`SwitchingStrategy`].
pub struct CompositeBackend {
    primary: Arc<dyn Backend>,
    fallback: Arc<dyn Backend>,
    config: Arc<CompositeBackendConfig>,
    stats: Arc<StatsInner>,
    circuit: Mutex<Circuit>,
    health_check_task: Mutex<Option<JoinHandle<()>>>,
}

impl CompositeBackend {
    /// Builds a composite fronting `primary` and `fallback`. Starts the
    /// Health Check background task immediately if that strategy is
    /// configured.
    pub fn new(
        primary: Arc<dyn Backend>,
        fallback: Arc<dyn Backend>,
        config: CompositeBackendConfig,
    ) -> Self {
        let config = Arc::new(config);
        let stats = Arc::new(StatsInner::default());
        let circuit = Mutex::new(Circuit::new(Arc::clone(&stats)));

        let health_check_task = if matches!(config.strategy, SwitchingStrategy::HealthCheck { .. })
        {
            Some(crate::health_check::spawn(
                Arc::clone(&primary),
                Arc::clone(&stats),
                Arc::clone(&config),
            ))
        } else {
            None
        };

        Self {
            primary,
            fallback,
            config,
            stats,
            circuit,
            health_check_task: Mutex::new(health_check_task),
        }
    }

    /// A snapshot of call/switch statistics.
    pub fn get_stats(&self) -> CompositeStats {
        self.stats.snapshot()
    }

    /// Administratively routes all traffic to primary (Circuit Breaker /
    /// Health Check strategies only; a no-op under Fail-Fast).
    pub fn force_switch_to_primary(&self) {
        self.circuit.lock().unwrap().force_to(
            CircuitState::Closed,
            &self.config.name,
            &self.config.event_listeners,
        );
    }

    /// Administratively routes all traffic to fallback.
    pub fn force_switch_to_fallback(&self) {
        self.circuit.lock().unwrap().force_to(
            CircuitState::Open,
            &self.config.name,
            &self.config.event_listeners,
        );
    }

    async fn check_circuit_breaker(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
        failure_threshold: u32,
        recovery_timeout: std::time::Duration,
    ) -> Result<Decision, BackendError> {
        let try_primary = {
            let mut circuit = self.circuit.lock().unwrap();
            circuit.should_try_primary(recovery_timeout, &self.config.name, &self.config.event_listeners)
        };

        if !try_primary {
            self.stats.fallback_calls.fetch_add(1, Ordering::Relaxed);
            let result = self.fallback.check_limit(key, times, window_ms).await;
            if result.is_err() {
                self.stats.fallback_failures.fetch_add(1, Ordering::Relaxed);
            }
            return result;
        }

        self.stats.primary_calls.fetch_add(1, Ordering::Relaxed);
        match self.primary.check_limit(key, times, window_ms).await {
            Ok(decision) => {
                self.circuit
                    .lock()
                    .unwrap()
                    .record_primary_success(&self.config.name, &self.config.event_listeners);
                Ok(decision)
            }
            Err(_) => {
                self.stats.primary_failures.fetch_add(1, Ordering::Relaxed);
                self.circuit.lock().unwrap().record_primary_failure(
                    failure_threshold,
                    &self.config.name,
                    &self.config.event_listeners,
                );
                self.stats.fallback_calls.fetch_add(1, Ordering::Relaxed);
                let result = self.fallback.check_limit(key, times, window_ms).await;
                if result.is_err() {
                    self.stats.fallback_failures.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
        }
    }

    async fn check_health_check(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        let state = CircuitState::from_u8(self.stats.state.load(Ordering::Acquire));
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                self.stats.primary_calls.fetch_add(1, Ordering::Relaxed);
                let result = self.primary.check_limit(key, times, window_ms).await;
                if result.is_err() {
                    self.stats.primary_failures.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
            CircuitState::Open => {
                self.stats.fallback_calls.fetch_add(1, Ordering::Relaxed);
                let result = self.fallback.check_limit(key, times, window_ms).await;
                if result.is_err() {
                    self.stats.fallback_failures.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
        }
    }

    async fn check_fail_fast(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        self.stats.primary_calls.fetch_add(1, Ordering::Relaxed);
        match self.primary.check_limit(key, times, window_ms).await {
            Ok(decision) => Ok(decision),
            Err(err) => {
                self.stats.primary_failures.fetch_add(1, Ordering::Relaxed);

                #[cfg(feature = "tracing")]
                tracing::warn!(backend = %self.config.name, %err, "ratekeeper composite fail-fast retrying on fallback");

                self.config
                    .event_listeners
                    .emit(&CompositeBackendEvent::FailedOverForRequest {
                        backend_name: self.config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        reason: err.to_string(),
                    });

                self.stats.fallback_calls.fetch_add(1, Ordering::Relaxed);
                let result = self.fallback.check_limit(key, times, window_ms).await;
                if result.is_err() {
                    self.stats.fallback_failures.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
        }
    }
}

#[async_trait]
impl Backend for CompositeBackend {
    async fn check_limit(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        match self.config.strategy {
            SwitchingStrategy::CircuitBreaker {
                failure_threshold,
                recovery_timeout,
            } => {
                self.check_circuit_breaker(key, times, window_ms, failure_threshold, recovery_timeout)
                    .await
            }
            SwitchingStrategy::HealthCheck { .. } => {
                self.check_health_check(key, times, window_ms).await
            }
            SwitchingStrategy::FailFast => self.check_fail_fast(key, times, window_ms).await,
        }
    }

    fn is_connected(&self) -> bool {
        self.primary.is_connected() || self.fallback.is_connected()
    }

    async fn shutdown(&self) {
        if let Some(handle) = self.health_check_task.lock().unwrap().take() {
            handle.abort();
        }
        self.primary.shutdown().await;
        self.fallback.shutdown().await;
    }
}
