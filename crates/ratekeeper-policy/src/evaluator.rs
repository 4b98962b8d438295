//! [`Evaluator`]: glue between a policy, a request/response pair, and an
//! active backend.

use crate::policy::LimitPolicy;
use crate::request::{Request, Response};
use ratekeeper_core::{Backend, BackendError, Decision};
use std::sync::Arc;

/// Calls the active backend on behalf of a [`LimitPolicy`] and, on
/// rejection, runs the policy's `on_reject` callback.
///
/// Holds an explicit `Arc<dyn Backend>` rather than reaching for the
/// process-wide singleton in [`crate::registry`]. Dependency-injected use
/// is the primary path; the registry is a convenience for call sites that
/// would otherwise have to thread the backend through everywhere.
pub struct Evaluator {
    backend: Arc<dyn Backend>,
}

impl Evaluator {
    /// Builds an evaluator around an explicit backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Evaluates `policy` against `request`, running `policy.on_reject` on
    /// `response` if the request is rejected.
    ///
    /// Returns the raw [`Decision`] either way; the caller is expected to
    /// skip its handler when `decision.is_rejected()`.
    pub async fn evaluate<Req, Resp>(
        &self,
        policy: &LimitPolicy<Req, Resp>,
        request: &Req,
        response: &mut Resp,
    ) -> Result<Decision, BackendError>
    where
        Req: Request,
        Resp: Response,
    {
        let id = policy.identify(request);
        let key = format!("{}:{}:{}", policy.prefix, id, policy.route_index());

        let decision = self
            .backend
            .check_limit(&key, policy.times(), policy.window_ms())
            .await?;

        if decision.is_rejected() {
            policy.reject(request, response, decision);
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct TestRequest;
    impl Request for TestRequest {
        fn client_address(&self) -> &str {
            "10.0.0.1"
        }
        fn route_path(&self) -> &str {
            "/login"
        }
    }

    struct TestResponse {
        status: u16,
    }
    impl Response for TestResponse {
        fn set_status(&mut self, status: u16) {
            self.status = status;
        }
        fn set_header(&mut self, _name: &str, _value: &str) {}
    }

    struct RecordingBackend {
        seen_key: std::sync::Mutex<Option<String>>,
        reject: bool,
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        async fn check_limit(
            &self,
            key: &str,
            times: u64,
            _window_ms: u64,
        ) -> Result<Decision, BackendError> {
            *self.seen_key.lock().unwrap() = Some(key.to_string());
            if self.reject {
                Ok(Decision::reject(1000, times + 1))
            } else {
                Ok(Decision::admit(1))
            }
        }
        fn is_connected(&self) -> bool {
            true
        }
        async fn shutdown(&self) {}
    }

    #[tokio::test]
    async fn evaluate_builds_the_prefix_id_route_index_key() {
        let backend = Arc::new(RecordingBackend {
            seen_key: std::sync::Mutex::new(None),
            reject: false,
        });
        let evaluator = Evaluator::new(backend.clone());
        let policy = LimitPolicy::builder()
            .times(5)
            .window_ms(1000)
            .prefix("fastex")
            .route_index(2)
            .build();

        let request = TestRequest;
        let mut response = TestResponse { status: 200 };
        let decision = evaluator.evaluate(&policy, &request, &mut response).await.unwrap();

        assert!(decision.is_admitted());
        assert_eq!(
            backend.seen_key.lock().unwrap().as_deref(),
            Some("fastex:10.0.0.1:/login:2")
        );
    }

    #[tokio::test]
    async fn a_rejected_decision_runs_on_reject() {
        let backend = Arc::new(RecordingBackend {
            seen_key: std::sync::Mutex::new(None),
            reject: true,
        });
        let evaluator = Evaluator::new(backend);
        let policy = LimitPolicy::builder().times(5).window_ms(1000).build();

        let request = TestRequest;
        let mut response = TestResponse { status: 200 };
        let decision = evaluator.evaluate(&policy, &request, &mut response).await.unwrap();

        assert!(decision.is_rejected());
        assert_eq!(response.status, 429);
    }
}
