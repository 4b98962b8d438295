//! [`RateLimitLayer`]: wraps a service with an ordered stack of rate-limit
//! policies.

use crate::service::RateLimit;
use ratekeeper_core::Backend;
use ratekeeper_policy::{Evaluator, LimitPolicy, Request, Response};
use std::sync::Arc;
use tower_layer::Layer;

/// A [`tower::Layer`] that evaluates one or more [`LimitPolicy`]s against
/// every inbound request before letting it reach the wrapped service.
///
/// Policies are evaluated in the order given to [`RateLimitLayer::new`] and
/// the first rejection short-circuits: later policies are never evaluated
/// and the wrapped service is never called.
pub struct RateLimitLayer<Req, Resp> {
    policies: Arc<Vec<LimitPolicy<Req, Resp>>>,
    evaluator: Arc<Evaluator>,
}

impl<Req, Resp> RateLimitLayer<Req, Resp>
where
    Req: Request,
    Resp: Response,
{
    /// Builds a layer that runs `policies`, in order, against `backend`.
    pub fn new(backend: Arc<dyn Backend>, policies: Vec<LimitPolicy<Req, Resp>>) -> Self {
        Self {
            policies: Arc::new(policies),
            evaluator: Arc::new(Evaluator::new(backend)),
        }
    }
}

impl<Req, Resp> Clone for RateLimitLayer<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            policies: Arc::clone(&self.policies),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}

impl<S, Req, Resp> Layer<S> for RateLimitLayer<Req, Resp>
where
    Req: Request,
    Resp: Response,
{
    type Service = RateLimit<S, Req, Resp>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            policies: Arc::clone(&self.policies),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}
