//! Observability events emitted by the composite backend.

use ratekeeper_core::RateKeeperEvent;
use std::time::Instant;

/// Which backend a composite routed a call to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBackend {
    Primary,
    Fallback,
}

/// Events the composite backend emits through its
/// [`ratekeeper_core::EventListeners`].
#[derive(Debug, Clone)]
pub enum CompositeBackendEvent {
    /// The circuit-breaker or health-check strategy changed which backend
    /// traffic is routed to.
    SwitchedTo {
        backend_name: String,
        timestamp: Instant,
        active: ActiveBackend,
    },
    /// A call to the primary failed and the fail-fast strategy retried it
    /// on the fallback within the same request.
    FailedOverForRequest {
        backend_name: String,
        timestamp: Instant,
        reason: String,
    },
}

impl RateKeeperEvent for CompositeBackendEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompositeBackendEvent::SwitchedTo { .. } => "switched_to",
            CompositeBackendEvent::FailedOverForRequest { .. } => "failed_over_for_request",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CompositeBackendEvent::SwitchedTo { timestamp, .. }
            | CompositeBackendEvent::FailedOverForRequest { timestamp, .. } => *timestamp,
        }
    }

    fn backend_name(&self) -> &str {
        match self {
            CompositeBackendEvent::SwitchedTo { backend_name, .. }
            | CompositeBackendEvent::FailedOverForRequest { backend_name, .. } => backend_name,
        }
    }
}
