//! A [`tower::Layer`]/[`tower::Service`] adapter that stacks ordered
//! [`ratekeeper_policy::LimitPolicy`]s in front of an inner service.
//!
//! Generic over the framework-agnostic [`ratekeeper_policy::Request`]/
//! [`ratekeeper_policy::Response`] traits, so this crate never names a
//! concrete HTTP framework request or response type. Wiring those in is a
//! host's job, done once per framework.

mod layer;
mod service;

pub use layer::RateLimitLayer;
pub use ratekeeper_core::RateKeeperError;
pub use service::RateLimit;
