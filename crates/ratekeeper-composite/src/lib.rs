//! Primary/fallback failover backend.
//!
//! [`CompositeBackend`] fronts two [`ratekeeper_core::Backend`]s of the same
//! abstract interface and routes between them per a configured
//! [`SwitchingStrategy`]: a consecutive-failure circuit breaker (the
//! default), an edge-triggered health-check poller, or an immediate
//! fail-fast retry with no persisted state.

mod backend;
mod circuit;
mod config;
mod events;
mod health_check;
mod stats;

pub use backend::CompositeBackend;
pub use config::{CompositeBackendConfig, CompositeBackendConfigBuilder, SwitchingStrategy, HEALTH_CHECK_PROBE_KEY};
pub use events::{ActiveBackend, CompositeBackendEvent};
pub use stats::{CircuitState, CompositeStats};
