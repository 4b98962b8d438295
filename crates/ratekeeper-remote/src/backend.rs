//! The Redis-backed [`Backend`] implementation.

use crate::config::{FallbackMode, RemoteBackendConfig};
use crate::events::RemoteBackendEvent;
use crate::script::FixedWindowScript;
use async_trait::async_trait;
use ratekeeper_core::{Backend, BackendError, Decision};
use redis::aio::ConnectionManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Fixed-window rate-limit backend that delegates the atomic increment to a
/// Redis-shaped store.
///
/// Cheap to clone: the connection manager pools and multiplexes its own
/// connections, so cloning it (as every `check_limit` call does) is just an
/// `Arc` bump.
pub struct RemoteBackend {
    client: redis::Client,
    connection: Mutex<Option<ConnectionManager>>,
    script: FixedWindowScript,
    config: Arc<RemoteBackendConfig>,
    connected: AtomicBool,
}

impl RemoteBackend {
    /// Builds a new backend from `config`. Does not connect; call
    /// [`RemoteBackend::connect`] before the first `check_limit`.
    pub fn new(config: RemoteBackendConfig) -> Result<Self, BackendError> {
        let client =
            redis::Client::open(config.redis_url.as_str()).map_err(|e| BackendError::Config {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            script: FixedWindowScript::new(),
            config: Arc::new(config),
            connected: AtomicBool::new(false),
        })
    }

    /// Establishes the pooled connection. Idempotent.
    pub async fn connect(&self) -> Result<(), BackendError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let manager = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| BackendError::Unavailable {
                reason: e.to_string(),
            })?;
        *self.connection.lock().unwrap() = Some(manager);
        self.connected.store(true, Ordering::SeqCst);

        #[cfg(feature = "tracing")]
        tracing::info!(backend = %self.config.name, "ratekeeper remote backend connected");

        self.config.event_listeners.emit(&RemoteBackendEvent::Connected {
            backend_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
        Ok(())
    }

    /// Drops the pooled connection. Idempotent.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.connection.lock().unwrap() = None;

        #[cfg(feature = "tracing")]
        tracing::info!(backend = %self.config.name, "ratekeeper remote backend disconnected");

        self.config.event_listeners.emit(&RemoteBackendEvent::Disconnected {
            backend_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn make_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }

    fn fallback_decision(&self, times: u64, window_ms: u64, reason: String) -> Result<Decision, BackendError> {
        #[cfg(feature = "tracing")]
        tracing::warn!(backend = %self.config.name, %reason, mode = ?self.config.fallback_mode, "ratekeeper remote backend call failed");

        #[cfg(feature = "metrics")]
        metrics::counter!("ratekeeper_remote_fallbacks_total", "backend" => self.config.name.clone())
            .increment(1);

        self.config
            .event_listeners
            .emit(&RemoteBackendEvent::FallbackTriggered {
                backend_name: self.config.name.clone(),
                timestamp: Instant::now(),
                reason: reason.clone(),
            });

        match self.config.fallback_mode {
            FallbackMode::Allow => Ok(Decision::admit(0)),
            FallbackMode::Deny => Ok(Decision::reject(window_ms.max(1), times + 1)),
            FallbackMode::Raise => Err(BackendError::Unavailable { reason }),
        }
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn check_limit(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BackendError::NotConnected);
        }
        if times == 0 || window_ms == 0 {
            return Err(BackendError::Config {
                reason: "times and window_ms must both be >= 1".to_string(),
            });
        }

        let mut conn = self
            .connection
            .lock()
            .unwrap()
            .as_ref()
            .expect("connected implies a connection manager is present")
            .clone();

        let prefixed_key = self.make_key(key);
        let call = self.script.invoke(&mut conn, &prefixed_key, times, window_ms);

        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(decision)) => {
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "ratekeeper_remote_checks_total",
                    "backend" => self.config.name.clone(),
                    "outcome" => if decision.is_admitted() { "admitted" } else { "rejected" }
                )
                .increment(1);

                Ok(decision)
            }
            Ok(Err(err)) => self.fallback_decision(times, window_ms, err.to_string()),
            Err(_elapsed) => self.fallback_decision(times, window_ms, "call timed out".to_string()),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteBackendConfig;

    #[test]
    fn new_rejects_an_unparseable_url() {
        let config = RemoteBackendConfig::builder("not-a-redis-url").build();
        let result = RemoteBackend::new(config);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn check_limit_before_connect_is_not_connected() {
        let config = RemoteBackendConfig::builder("redis://127.0.0.1:6379").build();
        let backend = RemoteBackend::new(config).unwrap();
        let err = backend.check_limit("k", 1, 1000).await.unwrap_err();
        assert!(matches!(err, BackendError::NotConnected));
    }

    fn backend_with_mode(mode: crate::config::FallbackMode) -> RemoteBackend {
        let config = RemoteBackendConfig::builder("redis://127.0.0.1:6379")
            .fallback_mode(mode)
            .build();
        RemoteBackend::new(config).unwrap()
    }

    #[test]
    fn s5_fallback_mode_allow_admits_with_zero_count() {
        let backend = backend_with_mode(crate::config::FallbackMode::Allow);
        let decision = backend
            .fallback_decision(5, 1000, "store unreachable".to_string())
            .unwrap();
        assert!(decision.is_admitted());
        assert_eq!(decision.current_count, 0);
    }

    #[test]
    fn fallback_mode_deny_rejects_with_the_full_window() {
        let backend = backend_with_mode(crate::config::FallbackMode::Deny);
        let decision = backend
            .fallback_decision(5, 1000, "store unreachable".to_string())
            .unwrap();
        assert!(decision.is_rejected());
        assert_eq!(decision.retry_after_ms, 1000);
        assert_eq!(decision.current_count, 6);
    }

    #[test]
    fn fallback_mode_raise_surfaces_the_error() {
        let backend = backend_with_mode(crate::config::FallbackMode::Raise);
        let err = backend
            .fallback_decision(5, 1000, "store unreachable".to_string())
            .unwrap_err();
        assert!(matches!(err, BackendError::Unavailable { .. }));
    }
}
