//! Configuration for the composite backend.

use crate::events::CompositeBackendEvent;
use ratekeeper_core::{BackendError, EventListeners, FnListener};
use std::time::Duration;

/// The key the Health Check strategy probes `check_limit` against. Reserved:
/// application traffic must not use it.
pub const HEALTH_CHECK_PROBE_KEY: &str = "__healthcheck__";

/// How the composite backend decides when to route traffic to `fallback`
/// instead of `primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchingStrategy {
    /// Consecutive-failure threshold with a cooldown before probing primary
    /// again. See the state machine in [`crate::backend::CompositeBackend`].
    CircuitBreaker {
        failure_threshold: u32,
        recovery_timeout: Duration,
    },
    /// A background task polls `primary.is_connected()` (and, if connected,
    /// a no-op probe call) on an interval; routing follows that observation
    /// alone.
    HealthCheck { interval: Duration },
    /// Every call goes to primary first; on failure it is retried on
    /// fallback within the same request, with no persisted state.
    FailFast,
}

impl SwitchingStrategy {
    /// The default circuit-breaker strategy: 5 consecutive failures opens
    /// the circuit, with a 60 second cooldown before the next probe.
    pub fn default_circuit_breaker() -> Self {
        SwitchingStrategy::CircuitBreaker {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration for [`crate::CompositeBackend`].
pub struct CompositeBackendConfig {
    pub(crate) strategy: SwitchingStrategy,
    pub(crate) event_listeners: EventListeners<CompositeBackendEvent>,
    pub(crate) name: String,
}

impl CompositeBackendConfig {
    /// Creates a new builder with defaults.
    pub fn builder() -> CompositeBackendConfigBuilder {
        CompositeBackendConfigBuilder::new()
    }
}

/// Builder for [`CompositeBackendConfig`].
pub struct CompositeBackendConfigBuilder {
    strategy: SwitchingStrategy,
    event_listeners: EventListeners<CompositeBackendEvent>,
    name: String,
}

impl Default for CompositeBackendConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeBackendConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `strategy`: [`SwitchingStrategy::default_circuit_breaker`]
    /// - `name`: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            strategy: SwitchingStrategy::default_circuit_breaker(),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the switching strategy.
    pub fn strategy(mut self, strategy: SwitchingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the name for this backend instance (used in events/metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever the active backend switches.
    pub fn on_switch<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::events::ActiveBackend) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CompositeBackendEvent::SwitchedTo { active, .. } = event {
                f(*active);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    pub fn try_build(self) -> Result<CompositeBackendConfig, BackendError> {
        if let SwitchingStrategy::CircuitBreaker {
            failure_threshold, ..
        } = self.strategy
        {
            if failure_threshold == 0 {
                return Err(BackendError::Config {
                    reason: "failure_threshold must be >= 1".to_string(),
                });
            }
        }
        Ok(CompositeBackendConfig {
            strategy: self.strategy,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Builds the configuration, panicking on invalid values.
    ///
    /// Use [`CompositeBackendConfigBuilder::try_build`] to handle invalid
    /// config without panicking.
    pub fn build(self) -> CompositeBackendConfig {
        self.try_build().expect("invalid CompositeBackendConfig")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_successfully() {
        let config = CompositeBackendConfig::builder().build();
        assert!(matches!(
            config.strategy,
            SwitchingStrategy::CircuitBreaker { .. }
        ));
    }

    #[test]
    fn zero_failure_threshold_is_rejected() {
        let result = CompositeBackendConfig::builder()
            .strategy(SwitchingStrategy::CircuitBreaker {
                failure_threshold: 0,
                recovery_timeout: Duration::from_secs(1),
            })
            .try_build();
        assert!(result.is_err());
    }
}
