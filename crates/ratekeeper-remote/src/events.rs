//! Observability events emitted by the remote backend.

use ratekeeper_core::RateKeeperEvent;
use std::time::Instant;

/// Events the remote backend emits through its [`ratekeeper_core::EventListeners`].
#[derive(Debug, Clone)]
pub enum RemoteBackendEvent {
    /// The store connection was established.
    Connected {
        backend_name: String,
        timestamp: Instant,
    },
    /// The store connection was torn down.
    Disconnected {
        backend_name: String,
        timestamp: Instant,
    },
    /// The store call failed (network, timeout, or script error) and the
    /// configured [`crate::FallbackMode`] decided the outcome in its place.
    FallbackTriggered {
        backend_name: String,
        timestamp: Instant,
        reason: String,
    },
}

impl RateKeeperEvent for RemoteBackendEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RemoteBackendEvent::Connected { .. } => "connected",
            RemoteBackendEvent::Disconnected { .. } => "disconnected",
            RemoteBackendEvent::FallbackTriggered { .. } => "fallback_triggered",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RemoteBackendEvent::Connected { timestamp, .. }
            | RemoteBackendEvent::Disconnected { timestamp, .. }
            | RemoteBackendEvent::FallbackTriggered { timestamp, .. } => *timestamp,
        }
    }

    fn backend_name(&self) -> &str {
        match self {
            RemoteBackendEvent::Connected { backend_name, .. }
            | RemoteBackendEvent::Disconnected { backend_name, .. }
            | RemoteBackendEvent::FallbackTriggered { backend_name, .. } => backend_name,
        }
    }
}
