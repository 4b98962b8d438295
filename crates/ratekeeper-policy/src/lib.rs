//! Policy and evaluator glue between framework middleware and ratekeeper
//! backends.
//!
//! [`LimitPolicy`] describes one rate-limit rule; [`Evaluator`] runs it
//! against an active backend and invokes the policy's rejection callback.
//! [`registry`] is a process-wide convenience singleton for call sites that
//! don't want to thread an `Arc<dyn Backend>` through explicitly.

mod evaluator;
mod policy;
mod request;
pub mod registry;

pub use evaluator::Evaluator;
pub use policy::{LimitPolicy, LimitPolicyBuilder};
pub use request::{Request, Response};
