//! A fixed-window rate-limiting core for HTTP services.
//!
//! `ratekeeper` provides a `check_limit(key, times, window_ms) -> Decision`
//! contract ([`core::Backend`]) plus a few backends that implement it, and
//! thin glue to stack that contract in front of a framework request. Each
//! piece is available as its own crate and as a feature on this meta-crate.
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! ratekeeper = { version = "0.1", features = ["local", "tower"] }
//! ```
//!
//! # Backends
//!
//! - **[`local`]** - an in-memory, sharded counter map. No network hop, no
//!   cross-process consistency.
//! - **[`remote`]** - a Redis-backed counter, atomic via a Lua script with an
//!   unscripted fallback, with a configurable [`remote::FallbackMode`] for
//!   when the store itself is unreachable.
//! - **[`composite`]** - fronts a primary and a fallback backend, switching
//!   between them via a circuit breaker, a background health check, or
//!   fail-fast per-request retry.
//!
//! # Policy and framework glue
//!
//! - **[`policy`]** - [`policy::LimitPolicy`] and [`policy::Evaluator`] connect
//!   a backend to a request/response pair without naming a concrete HTTP
//!   framework type.
//! - **[`tower`]** - [`tower::RateLimitLayer`] stacks an ordered list of
//!   policies in front of any `tower::Service`.
//!
//! None of these backends implement sliding-window or token-bucket limiting,
//! replicate counters across backends, or persist counts across a restart.
//! The fixed-window counter is the only algorithm this crate speaks.

pub use ratekeeper_core as core;

#[cfg(feature = "local")]
pub use ratekeeper_local as local;

#[cfg(feature = "remote")]
pub use ratekeeper_remote as remote;

#[cfg(feature = "composite")]
pub use ratekeeper_composite as composite;

#[cfg(feature = "policy")]
pub use ratekeeper_policy as policy;

#[cfg(feature = "tower")]
pub use ratekeeper_tower as tower;
