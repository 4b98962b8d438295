//! The background reaper task.
//!
//! Exactly one reaper task runs per [`crate::LocalBackend`] instance. It
//! sweeps one shard at a time so a sweep never holds more than one shard's
//! lock simultaneously, keeping request-handler tail latency unaffected.

use crate::clock::now_ms;
use crate::config::LocalBackendConfig;
use crate::events::LocalBackendEvent;
use crate::shard::Shard;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::Instant as ClockInstant;

pub(crate) fn spawn(
    shards: Arc<Vec<Shard>>,
    config: Arc<LocalBackendConfig>,
    epoch: ClockInstant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.cleanup_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let now = now_ms(epoch);
            let mut removed_total = 0usize;
            for shard in shards.iter() {
                removed_total += shard.reap(now);
            }

            if removed_total > 0 {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    backend = %config.name,
                    removed = removed_total,
                    "ratekeeper local backend reaper swept expired entries"
                );

                #[cfg(feature = "metrics")]
                metrics::counter!("ratekeeper_local_reaped_total", "backend" => config.name.clone())
                    .increment(removed_total as u64);

                config.event_listeners.emit(&LocalBackendEvent::ReaperSwept {
                    backend_name: config.name.clone(),
                    timestamp: Instant::now(),
                    removed: removed_total,
                });
            }
        }
    })
}
