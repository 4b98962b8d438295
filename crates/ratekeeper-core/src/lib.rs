//! Core infrastructure shared by every `ratekeeper` crate.
//!
//! This crate provides:
//! - [`Backend`], the object-safe trait the local, remote, and composite
//!   backends all implement.
//! - [`Decision`], the `(retry_after_ms, current_count)` pair every
//!   `check_limit` call returns.
//! - [`BackendError`] / [`RateKeeperError`], the shared error taxonomy.
//! - The event system ([`RateKeeperEvent`], [`EventListener`],
//!   [`EventListeners`], [`FnListener`]) used for observability across
//!   patterns.

mod backend;
mod decision;
mod error;
pub mod events;

pub use backend::Backend;
pub use decision::Decision;
pub use error::{BackendError, RateKeeperError};
pub use events::{EventListener, EventListeners, FnListener, RateKeeperEvent};
