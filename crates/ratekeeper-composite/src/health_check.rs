//! The Health Check switching strategy's background poller.
//!
//! Routing follows `primary.is_connected()` (plus a lightweight probe call)
//! alone, observed on an interval and edge-triggered into the shared
//! [`StatsInner`] state atomic so the request path never waits on the
//! network to decide where to route.

use crate::config::{CompositeBackendConfig, HEALTH_CHECK_PROBE_KEY};
use crate::events::{ActiveBackend, CompositeBackendEvent};
use crate::stats::{CircuitState, StatsInner};
use ratekeeper_core::Backend;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

pub(crate) fn spawn(
    primary: Arc<dyn Backend>,
    stats: Arc<StatsInner>,
    config: Arc<CompositeBackendConfig>,
) -> JoinHandle<()> {
    let interval = match config.strategy {
        crate::config::SwitchingStrategy::HealthCheck { interval } => interval,
        _ => unreachable!("health_check::spawn is only called for the HealthCheck strategy"),
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let healthy = primary.is_connected()
                && primary
                    .check_limit(HEALTH_CHECK_PROBE_KEY, u64::MAX, 1)
                    .await
                    .is_ok();

            let new_state = if healthy {
                CircuitState::Closed
            } else {
                CircuitState::Open
            };
            let old = CircuitState::from_u8(stats.state.swap(new_state as u8, Ordering::AcqRel));

            if old == new_state {
                continue;
            }

            match new_state {
                CircuitState::Closed => {
                    stats.switches_to_primary.fetch_add(1, Ordering::Relaxed);
                }
                CircuitState::Open => {
                    stats.switches_to_fallback.fetch_add(1, Ordering::Relaxed);
                }
                CircuitState::HalfOpen => unreachable!("health check never sets HalfOpen"),
            }

            #[cfg(feature = "tracing")]
            tracing::info!(backend = %config.name, healthy, "ratekeeper composite health check observed a change");

            config.event_listeners.emit(&CompositeBackendEvent::SwitchedTo {
                backend_name: config.name.clone(),
                timestamp: Instant::now(),
                active: if healthy {
                    ActiveBackend::Primary
                } else {
                    ActiveBackend::Fallback
                },
            });
        }
    })
}
