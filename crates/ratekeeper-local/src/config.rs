//! Configuration for the local backend.

use crate::events::LocalBackendEvent;
use ratekeeper_core::{BackendError, EventListeners, FnListener};
use std::time::Duration;

/// Number of independently-locked shards the counter map is split across.
///
/// Not user-configurable: it is an implementation detail of how contention
/// is kept low, not a tuning knob exposed to callers.
pub(crate) const SHARD_COUNT: usize = 16;

/// Configuration for [`crate::LocalBackend`].
pub struct LocalBackendConfig {
    pub(crate) cleanup_interval: Duration,
    pub(crate) max_keys: usize,
    pub(crate) event_listeners: EventListeners<LocalBackendEvent>,
    pub(crate) name: String,
}

impl LocalBackendConfig {
    /// Creates a new builder with defaults.
    pub fn builder() -> LocalBackendConfigBuilder {
        LocalBackendConfigBuilder::new()
    }

    /// Reads configuration from the environment:
    /// - `RATEKEEPER_LOCAL_CLEANUP_INTERVAL_SECONDS` (default 60)
    /// - `RATEKEEPER_LOCAL_MAX_KEYS` (default 100_000)
    pub fn from_env() -> Result<Self, BackendError> {
        let mut builder = LocalBackendConfigBuilder::new();

        if let Ok(raw) = std::env::var("RATEKEEPER_LOCAL_CLEANUP_INTERVAL_SECONDS") {
            let secs: u64 = raw.parse().map_err(|_| BackendError::Config {
                reason: format!("RATEKEEPER_LOCAL_CLEANUP_INTERVAL_SECONDS: invalid u64 {raw:?}"),
            })?;
            builder = builder.cleanup_interval(Duration::from_secs(secs));
        }

        if let Ok(raw) = std::env::var("RATEKEEPER_LOCAL_MAX_KEYS") {
            let max_keys: usize = raw.parse().map_err(|_| BackendError::Config {
                reason: format!("RATEKEEPER_LOCAL_MAX_KEYS: invalid usize {raw:?}"),
            })?;
            builder = builder.max_keys(max_keys);
        }

        builder.try_build()
    }
}

/// Builder for [`LocalBackendConfig`].
pub struct LocalBackendConfigBuilder {
    cleanup_interval: Duration,
    max_keys: usize,
    event_listeners: EventListeners<LocalBackendEvent>,
    name: String,
}

impl Default for LocalBackendConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackendConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `cleanup_interval`: 60 seconds
    /// - `max_keys`: 100,000
    /// - `name`: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(60),
            max_keys: 100_000,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets how often the reaper sweeps expired entries.
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Sets the maximum number of live keys the map may hold. Once reached,
    /// new keys evict the entry with the earliest expiry.
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Sets the name for this backend instance (used in events/metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever the reaper sweeps expired
    /// entries.
    pub fn on_reaper_swept<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LocalBackendEvent::ReaperSwept { removed, .. } = event {
                f(*removed);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever capacity pressure evicts a key.
    pub fn on_capacity_evicted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LocalBackendEvent::CapacityEvicted { evicted_key, .. } = event {
                f(evicted_key);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    pub fn try_build(self) -> Result<LocalBackendConfig, BackendError> {
        if self.max_keys == 0 {
            return Err(BackendError::Config {
                reason: "max_keys must be >= 1".to_string(),
            });
        }
        Ok(LocalBackendConfig {
            cleanup_interval: self.cleanup_interval,
            max_keys: self.max_keys,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Builds the configuration, panicking on invalid values.
    ///
    /// Use [`LocalBackendConfigBuilder::try_build`] to handle invalid config
    /// without panicking.
    pub fn build(self) -> LocalBackendConfig {
        self.try_build().expect("invalid LocalBackendConfig")
    }
}
