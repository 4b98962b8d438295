//! [`RateLimit`]: the [`tower::Service`] produced by [`crate::RateLimitLayer`].

use futures::future::BoxFuture;
use ratekeeper_core::RateKeeperError;
use ratekeeper_policy::{Evaluator, LimitPolicy, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Wraps an inner [`tower::Service`] with an ordered stack of rate-limit
/// policies.
///
/// Policies run against a freshly-`Default`-constructed response before the
/// inner service is ever polled. The first rejection short-circuits: its
/// `on_reject` callback writes onto that response and it is returned
/// immediately, skipping both the remaining policies and the inner service.
/// Only once every policy admits the request does `call` reach `inner`.
pub struct RateLimit<S, Req, Resp> {
    pub(crate) inner: S,
    pub(crate) policies: Arc<Vec<LimitPolicy<Req, Resp>>>,
    pub(crate) evaluator: Arc<Evaluator>,
}

impl<S: Clone, Req, Resp> Clone for RateLimit<S, Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policies: Arc::clone(&self.policies),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}

impl<S, Req, Resp> Service<Req> for RateLimit<S, Req, Resp>
where
    S: Service<Req, Response = Resp> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    Req: Request + Send + 'static,
    Resp: Response + Default + Send + 'static,
{
    type Response = Resp;
    type Error = RateKeeperError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(RateKeeperError::Application)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Tower's `Service::call` contract requires the service actually
        // dispatched be the one `poll_ready` was called on; `std::mem::replace`
        // with a freshly-cloned one is the standard workaround for services
        // that aren't `Copy`.
        let mut inner = self.inner.clone();
        let policies = Arc::clone(&self.policies);
        let evaluator = Arc::clone(&self.evaluator);

        Box::pin(async move {
            let mut response = Resp::default();

            for policy in policies.iter() {
                let decision = evaluator
                    .evaluate(policy, &req, &mut response)
                    .await
                    .map_err(RateKeeperError::Backend)?;

                if decision.is_rejected() {
                    return Ok(response);
                }
            }

            inner.call(req).await.map_err(RateKeeperError::Application)
        })
    }
}
