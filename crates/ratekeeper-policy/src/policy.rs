//! [`LimitPolicy`]: an immutable description of one rate-limit rule.

use crate::request::{Request, Response};
use ratekeeper_core::{BackendError, Decision};
use std::time::Duration;

type IdentifierFn<Req> = Box<dyn Fn(&Req) -> String + Send + Sync>;
type OnRejectFn<Req, Resp> = Box<dyn Fn(&Req, &mut Resp, Decision) + Send + Sync>;

/// An immutable rate-limit rule: how many events per window, how counter
/// keys are derived, and what happens when a request is rejected.
///
/// Construction validates `times >= 1` and `window_ms >= 1` up front, so a
/// policy can never reach a backend in a state that would corrupt a counter.
pub struct LimitPolicy<Req, Resp> {
    pub(crate) times: u64,
    pub(crate) window_ms: u64,
    pub(crate) prefix: String,
    pub(crate) route_index: usize,
    identifier: IdentifierFn<Req>,
    on_reject: OnRejectFn<Req, Resp>,
}

impl<Req, Resp> LimitPolicy<Req, Resp>
where
    Req: Request,
    Resp: Response,
{
    /// Creates a new builder.
    pub fn builder() -> LimitPolicyBuilder<Req, Resp> {
        LimitPolicyBuilder::new()
    }

    pub fn times(&self) -> u64 {
        self.times
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn route_index(&self) -> usize {
        self.route_index
    }

    pub(crate) fn identify(&self, request: &Req) -> String {
        (self.identifier)(request)
    }

    pub(crate) fn reject(&self, request: &Req, response: &mut Resp, decision: Decision) {
        (self.on_reject)(request, response, decision)
    }
}

fn default_identifier<Req: Request>(request: &Req) -> String {
    format!("{}:{}", request.client_address(), request.route_path())
}

fn default_on_reject<Req, Resp: Response>(_request: &Req, response: &mut Resp, decision: Decision) {
    response.set_status(429);
    response.set_header("Retry-After", &decision.retry_after_seconds().to_string());
}

/// Builder for [`LimitPolicy`].
pub struct LimitPolicyBuilder<Req, Resp> {
    times: u64,
    window_ms: u64,
    prefix: String,
    route_index: usize,
    identifier: IdentifierFn<Req>,
    on_reject: OnRejectFn<Req, Resp>,
}

impl<Req, Resp> Default for LimitPolicyBuilder<Req, Resp>
where
    Req: Request,
    Resp: Response,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> LimitPolicyBuilder<Req, Resp>
where
    Req: Request,
    Resp: Response,
{
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `prefix`: `"fastex"`
    /// - `identifier`: `"{client-address}:{route-path}"`
    /// - `on_reject`: HTTP 429 with a `Retry-After` header in seconds
    /// - `route_index`: 0
    pub fn new() -> Self {
        Self {
            times: 0,
            window_ms: 0,
            prefix: "fastex".to_string(),
            route_index: 0,
            identifier: Box::new(default_identifier),
            on_reject: Box::new(default_on_reject),
        }
    }

    /// Sets the maximum number of events admitted per window.
    pub fn times(mut self, times: u64) -> Self {
        self.times = times;
        self
    }

    /// Sets the window length directly, in milliseconds.
    pub fn window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Sets the window length from a [`Duration`], summing whatever
    /// combination of seconds/minutes/hours the caller built it from.
    pub fn window(mut self, window: Duration) -> Self {
        self.window_ms = window.as_millis() as u64;
        self
    }

    /// Overrides the default key prefix.
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets this policy's position among the policies guarding a single
    /// route, so its counter is independent of any sibling policy's.
    pub fn route_index(mut self, route_index: usize) -> Self {
        self.route_index = route_index;
        self
    }

    /// Overrides how the caller-scoped part of the counter key is derived.
    pub fn identifier<F>(mut self, identifier: F) -> Self
    where
        F: Fn(&Req) -> String + Send + Sync + 'static,
    {
        self.identifier = Box::new(identifier);
        self
    }

    /// Overrides what happens when a request is rejected.
    pub fn on_reject<F>(mut self, on_reject: F) -> Self
    where
        F: Fn(&Req, &mut Resp, Decision) + Send + Sync + 'static,
    {
        self.on_reject = Box::new(on_reject);
        self
    }

    /// Validates and builds the policy.
    pub fn try_build(self) -> Result<LimitPolicy<Req, Resp>, BackendError> {
        if self.times == 0 {
            return Err(BackendError::Config {
                reason: "times must be >= 1".to_string(),
            });
        }
        if self.window_ms == 0 {
            return Err(BackendError::Config {
                reason: "window_ms must be >= 1".to_string(),
            });
        }
        Ok(LimitPolicy {
            times: self.times,
            window_ms: self.window_ms,
            prefix: self.prefix,
            route_index: self.route_index,
            identifier: self.identifier,
            on_reject: self.on_reject,
        })
    }

    /// Builds the policy, panicking on invalid values.
    ///
    /// Use [`LimitPolicyBuilder::try_build`] to handle invalid config
    /// without panicking.
    pub fn build(self) -> LimitPolicy<Req, Resp> {
        self.try_build().expect("invalid LimitPolicy")
    }
}
