//! Configuration for the remote backend.

use crate::events::RemoteBackendEvent;
use ratekeeper_core::{BackendError, EventListeners, FnListener};
use std::time::Duration;

/// What a [`crate::RemoteBackend`] does when the store is unreachable, times
/// out, or the script returns something outside its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    /// Let the request through: `Decision::admit(0)`.
    Allow,
    /// Block the request for a full window: `Decision::reject(window_ms, times + 1)`.
    Deny,
    /// Propagate the underlying [`BackendError`] to the caller.
    Raise,
}

/// Configuration for [`crate::RemoteBackend`].
pub struct RemoteBackendConfig {
    pub(crate) redis_url: String,
    pub(crate) fallback_mode: FallbackMode,
    pub(crate) timeout: Duration,
    pub(crate) key_prefix: Option<String>,
    pub(crate) event_listeners: EventListeners<RemoteBackendEvent>,
    pub(crate) name: String,
}

impl RemoteBackendConfig {
    /// Creates a new builder for the given connection URL.
    pub fn builder<S: Into<String>>(redis_url: S) -> RemoteBackendConfigBuilder {
        RemoteBackendConfigBuilder::new(redis_url.into())
    }

    /// Reads configuration from the environment:
    /// - `REDIS_URL` (required)
    /// - `FALLBACK_MODE` ∈ `allow` | `deny` | `raise` (default `raise`)
    /// - `REMOTE_TIMEOUT_MS` (default 1000)
    pub fn from_env() -> Result<Self, BackendError> {
        let redis_url = std::env::var("REDIS_URL").map_err(|_| BackendError::Config {
            reason: "REDIS_URL is not set".to_string(),
        })?;
        let mut builder = RemoteBackendConfigBuilder::new(redis_url);

        if let Ok(raw) = std::env::var("FALLBACK_MODE") {
            let mode = match raw.to_ascii_lowercase().as_str() {
                "allow" => FallbackMode::Allow,
                "deny" => FallbackMode::Deny,
                "raise" => FallbackMode::Raise,
                other => {
                    return Err(BackendError::Config {
                        reason: format!(
                            "FALLBACK_MODE: expected allow|deny|raise, got {other:?}"
                        ),
                    })
                }
            };
            builder = builder.fallback_mode(mode);
        }

        if let Ok(raw) = std::env::var("REMOTE_TIMEOUT_MS") {
            let ms: u64 = raw.parse().map_err(|_| BackendError::Config {
                reason: format!("REMOTE_TIMEOUT_MS: invalid u64 {raw:?}"),
            })?;
            builder = builder.timeout(Duration::from_millis(ms));
        }

        builder.try_build()
    }
}

/// Builder for [`RemoteBackendConfig`].
pub struct RemoteBackendConfigBuilder {
    redis_url: String,
    fallback_mode: FallbackMode,
    timeout: Duration,
    key_prefix: Option<String>,
    event_listeners: EventListeners<RemoteBackendEvent>,
    name: String,
}

impl RemoteBackendConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `fallback_mode`: [`FallbackMode::Raise`]
    /// - `timeout`: 1000ms
    /// - `name`: `"<unnamed>"`
    pub fn new(redis_url: String) -> Self {
        Self {
            redis_url,
            fallback_mode: FallbackMode::Raise,
            timeout: Duration::from_millis(1000),
            key_prefix: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets what happens on a store failure.
    pub fn fallback_mode(mut self, mode: FallbackMode) -> Self {
        self.fallback_mode = mode;
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prefixes every counter key, for namespacing shared stores.
    pub fn key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the name for this backend instance (used in events/metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a store failure triggers the
    /// configured fallback mode.
    pub fn on_fallback_triggered<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RemoteBackendEvent::FallbackTriggered { reason, .. } = event {
                f(reason);
            }
        }));
        self
    }

    /// Validates and builds the configuration.
    pub fn try_build(self) -> Result<RemoteBackendConfig, BackendError> {
        if self.redis_url.is_empty() {
            return Err(BackendError::Config {
                reason: "redis_url must not be empty".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(BackendError::Config {
                reason: "timeout must be >= 1ms".to_string(),
            });
        }
        Ok(RemoteBackendConfig {
            redis_url: self.redis_url,
            fallback_mode: self.fallback_mode,
            timeout: self.timeout,
            key_prefix: self.key_prefix,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }

    /// Builds the configuration, panicking on invalid values.
    ///
    /// Use [`RemoteBackendConfigBuilder::try_build`] to handle invalid
    /// config without panicking.
    pub fn build(self) -> RemoteBackendConfig {
        self.try_build().expect("invalid RemoteBackendConfig")
    }
}
