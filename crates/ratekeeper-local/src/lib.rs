//! In-process fixed-window rate-limit backend.
//!
//! [`LocalBackend`] keeps one [`ratekeeper_core::Decision`]-producing counter
//! map per process: a concurrency-safe, sharded `HashMap<String,
//! CounterEntry>` with TTL expiry, a background reaper, and a capacity guard
//! so the map can never grow unbounded.
//!
//! # Example
//!
//! ```
//! use ratekeeper_local::{LocalBackend, LocalBackendConfig};
//! use ratekeeper_core::Backend;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let backend = LocalBackend::new(
//!     LocalBackendConfig::builder()
//!         .max_keys(10_000)
//!         .cleanup_interval(Duration::from_secs(30))
//!         .build(),
//! );
//! backend.connect().await;
//!
//! let decision = backend.check_limit("u:1", 3, 1000).await.unwrap();
//! assert!(decision.is_admitted());
//! # }
//! ```

mod clock;
mod config;
mod entry;
mod events;
mod reaper;
mod shard;
mod stats;

pub use config::{LocalBackendConfig, LocalBackendConfigBuilder};
pub use events::LocalBackendEvent;
pub use stats::LocalBackendStats;

use async_trait::async_trait;
use config::SHARD_COUNT;
use ratekeeper_core::{Backend, BackendError, Decision};
use shard::Shard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::Instant as ClockInstant;

/// Below this size, a single shard is used: sharding only pays for itself
/// once the map is large enough that lock contention would otherwise bite.
const SINGLE_SHARD_THRESHOLD: usize = SHARD_COUNT * 4;

fn shard_count_for(max_keys: usize) -> usize {
    if max_keys <= SINGLE_SHARD_THRESHOLD {
        1
    } else {
        SHARD_COUNT
    }
}

/// Splits `max_keys` as evenly as possible across `shard_count` shards such
/// that the per-shard caps sum to exactly `max_keys`. This keeps
/// `get_stats().total_keys <= max_keys` an exact invariant rather than an
/// approximation.
fn shard_caps(max_keys: usize, shard_count: usize) -> Vec<usize> {
    let base = max_keys / shard_count;
    let remainder = max_keys % shard_count;
    (0..shard_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

fn shard_index(key: &str, shard_count: usize) -> usize {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count
}

/// In-process fixed-window rate-limit backend.
///
/// Cheap to clone: the counter map and reaper handle are shared via `Arc`.
pub struct LocalBackend {
    shards: Arc<Vec<Shard>>,
    config: Arc<LocalBackendConfig>,
    connected: Arc<AtomicBool>,
    reaper_handle: Mutex<Option<JoinHandle<()>>>,
    epoch: ClockInstant,
}

impl LocalBackend {
    /// Builds a new backend from `config`. The backend is not connected
    /// (the reaper is not running) until [`LocalBackend::connect`] is
    /// called.
    pub fn new(config: LocalBackendConfig) -> Self {
        let shard_count = shard_count_for(config.max_keys);
        let shards = shard_caps(config.max_keys, shard_count)
            .into_iter()
            .map(Shard::new)
            .collect();

        Self {
            shards: Arc::new(shards),
            config: Arc::new(config),
            connected: Arc::new(AtomicBool::new(false)),
            reaper_handle: Mutex::new(None),
            epoch: clock::epoch(),
        }
    }

    /// Starts the reaper task. Idempotent: calling `connect` on an already
    /// connected backend is a no-op.
    pub async fn connect(&self) {
        if self.connected.swap(true, Ordering::SeqCst) {
            return;
        }
        let handle = reaper::spawn(Arc::clone(&self.shards), Arc::clone(&self.config), self.epoch);
        *self.reaper_handle.lock().unwrap() = Some(handle);

        #[cfg(feature = "tracing")]
        tracing::info!(backend = %self.config.name, "ratekeeper local backend connected");
    }

    /// Stops the reaper task. Idempotent.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.reaper_handle.lock().unwrap().take() {
            handle.abort();
        }

        #[cfg(feature = "tracing")]
        tracing::info!(backend = %self.config.name, "ratekeeper local backend disconnected");
    }

    /// Returns a snapshot of the counter map's size.
    pub fn get_stats(&self) -> LocalBackendStats {
        let now = clock::now_ms(self.epoch);
        let total_keys = self.shards.iter().map(|s| s.live_count(now)).sum();
        let total_entries = self.shards.iter().map(Shard::raw_count).sum();
        LocalBackendStats {
            total_keys,
            total_entries,
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
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

        let shard = &self.shards[shard_index(key, self.shards.len())];
        let now = clock::now_ms(self.epoch);
        let (decision, evicted) = shard.check_limit(key, times, window_ms, now);

        if let Some(evicted) = evicted {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                backend = %self.config.name,
                evicted_key = %evicted.key,
                "ratekeeper local backend evicted a key to make room"
            );

            #[cfg(feature = "metrics")]
            metrics::counter!("ratekeeper_local_capacity_evictions_total", "backend" => self.config.name.clone())
                .increment(1);

            self.config
                .event_listeners
                .emit(&LocalBackendEvent::CapacityEvicted {
                    backend_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    evicted_key: evicted.key,
                });
        }

        if decision.current_count == 1 {
            self.config
                .event_listeners
                .emit(&LocalBackendEvent::EntryCreated {
                    backend_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.to_string(),
                });
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "ratekeeper_local_checks_total",
            "backend" => self.config.name.clone(),
            "outcome" => if decision.is_admitted() { "admitted" } else { "rejected" }
        )
        .increment(1);

        Ok(decision)
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
    use std::time::Duration;

    fn backend(max_keys: usize) -> LocalBackend {
        LocalBackend::new(
            LocalBackendConfig::builder()
                .max_keys(max_keys)
                .cleanup_interval(Duration::from_millis(50))
                .build(),
        )
    }

    #[tokio::test]
    async fn check_limit_before_connect_is_not_connected() {
        let backend = backend(100);
        let err = backend.check_limit("k", 1, 1000).await.unwrap_err();
        assert!(matches!(err, BackendError::NotConnected));
    }

    #[tokio::test]
    async fn s1_basic_admission_then_rejection_then_new_window() {
        let backend = backend(100);
        backend.connect().await;

        for expected_count in 1..=3u64 {
            let d = backend.check_limit("u:1", 3, 1000).await.unwrap();
            assert!(d.is_admitted());
            assert_eq!(d.current_count, expected_count);
        }

        let rejected = backend.check_limit("u:1", 3, 1000).await.unwrap();
        assert!(rejected.is_rejected());
        assert_eq!(rejected.current_count, 4);
        assert!(rejected.retry_after_ms <= 1000);
    }

    #[tokio::test]
    async fn s4_capacity_eviction_evicts_earliest_expiry() {
        let backend = backend(2);
        backend.connect().await;

        backend.check_limit("K1", 10, 10_000).await.unwrap();
        backend.check_limit("K2", 10, 20_000).await.unwrap();
        backend.check_limit("K3", 10, 5_000).await.unwrap();

        let stats = backend.get_stats();
        assert_eq!(stats.total_keys, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn s6_cross_window_boundary_resets_the_counter() {
        let backend = backend(100);
        backend.connect().await;

        let a = backend.check_limit("u:1", 2, 1000).await.unwrap();
        assert!(a.is_admitted());
        assert_eq!(a.current_count, 1);
        let b = backend.check_limit("u:1", 2, 1000).await.unwrap();
        assert!(b.is_admitted());
        assert_eq!(b.current_count, 2);

        tokio::time::advance(Duration::from_millis(1000)).await;

        let c = backend.check_limit("u:1", 2, 1000).await.unwrap();
        assert!(c.is_admitted());
        assert_eq!(c.current_count, 1);
        let d = backend.check_limit("u:1", 2, 1000).await.unwrap();
        assert!(d.is_admitted());
        assert_eq!(d.current_count, 2);
        let e = backend.check_limit("u:1", 2, 1000).await.unwrap();
        assert!(e.is_rejected());
        assert_eq!(e.current_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_liveness_removes_stale_entry_after_two_intervals() {
        let backend = LocalBackend::new(
            LocalBackendConfig::builder()
                .max_keys(100)
                .cleanup_interval(Duration::from_millis(100))
                .build(),
        );
        backend.connect().await;

        backend.check_limit("u:1", 1, 50).await.unwrap();
        tokio::time::advance(Duration::from_millis(250)).await;
        // Give the reaper task a chance to run after the clock advance.
        tokio::task::yield_now().await;

        let stats = backend.get_stats();
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn shutdown_makes_check_limit_fail_and_is_idempotent() {
        let backend = backend(100);
        backend.connect().await;
        backend.shutdown().await;
        backend.shutdown().await;

        let err = backend.check_limit("k", 1, 1000).await.unwrap_err();
        assert!(matches!(err, BackendError::NotConnected));
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let backend = backend(100);
        backend.connect().await;
        backend.connect().await;
        assert!(backend.is_connected());
    }

    proptest::proptest! {
        #[test]
        fn invariant_total_keys_never_exceeds_max_keys(max_keys in 1usize..200, inserts in 0usize..500) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let backend = backend(max_keys);
                backend.connect().await;
                for i in 0..inserts {
                    backend.check_limit(&format!("key-{i}"), 1000, 60_000).await.unwrap();
                }
                let stats = backend.get_stats();
                assert!(stats.total_keys <= max_keys);
            });
        }
    }
}
