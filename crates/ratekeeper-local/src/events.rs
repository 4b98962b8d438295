//! Observability events emitted by the local backend.

use ratekeeper_core::RateKeeperEvent;
use std::time::Instant;

/// Events the local backend emits through its [`ratekeeper_core::EventListeners`].
#[derive(Debug, Clone)]
pub enum LocalBackendEvent {
    /// A brand-new counter entry was created for a key.
    EntryCreated {
        backend_name: String,
        timestamp: Instant,
        key: String,
    },
    /// The reaper swept one or more expired entries from a shard.
    ReaperSwept {
        backend_name: String,
        timestamp: Instant,
        removed: usize,
    },
    /// A new key arrived while its shard was at capacity, so the entry with
    /// the earliest expiry was evicted to make room.
    CapacityEvicted {
        backend_name: String,
        timestamp: Instant,
        evicted_key: String,
    },
}

impl RateKeeperEvent for LocalBackendEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LocalBackendEvent::EntryCreated { .. } => "entry_created",
            LocalBackendEvent::ReaperSwept { .. } => "reaper_swept",
            LocalBackendEvent::CapacityEvicted { .. } => "capacity_evicted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LocalBackendEvent::EntryCreated { timestamp, .. }
            | LocalBackendEvent::ReaperSwept { timestamp, .. }
            | LocalBackendEvent::CapacityEvicted { timestamp, .. } => *timestamp,
        }
    }

    fn backend_name(&self) -> &str {
        match self {
            LocalBackendEvent::EntryCreated { backend_name, .. }
            | LocalBackendEvent::ReaperSwept { backend_name, .. }
            | LocalBackendEvent::CapacityEvicted { backend_name, .. } => backend_name,
        }
    }
}
