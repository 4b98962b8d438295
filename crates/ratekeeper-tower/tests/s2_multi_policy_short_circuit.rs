use ratekeeper_core::Backend;
use ratekeeper_local::{LocalBackend, LocalBackendConfig};
use ratekeeper_policy::{LimitPolicy, Request, Response};
use ratekeeper_tower::RateLimitLayer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

#[derive(Clone)]
struct FixedRequest {
    client: &'static str,
}

impl Request for FixedRequest {
    fn client_address(&self) -> &str {
        self.client
    }
    fn route_path(&self) -> &str {
        "/checkout"
    }
}

#[derive(Default)]
struct RecordingResponse {
    status: u16,
}

impl Response for RecordingResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }
    fn set_header(&mut self, _name: &str, _value: &str) {}
}

/// An inner service that records every call it actually receives, so the
/// test can assert it was skipped entirely once a policy rejects.
#[derive(Clone)]
struct CountingInner {
    calls: Arc<AtomicUsize>,
}

impl Service<FixedRequest> for CountingInner {
    type Response = RecordingResponse;
    type Error = std::convert::Infallible;
    type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: FixedRequest) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(RecordingResponse { status: 200 }))
    }
}

/// P2 (tight: 1 request/second) is placed ahead of P1 (loose: 5/minute) in
/// the stack, so the second call is rejected by P2 before P1 is ever
/// evaluated and before the inner service is ever reached.
#[tokio::test]
async fn s2_two_stacked_policies_short_circuit_on_the_tighter_one() {
    let backend = Arc::new(LocalBackend::new(
        LocalBackendConfig::builder().max_keys(10).build(),
    ));
    backend.connect().await;

    let tight = LimitPolicy::builder()
        .times(1)
        .window(Duration::from_secs(1))
        .route_index(0)
        .build();
    let loose = LimitPolicy::builder()
        .times(5)
        .window(Duration::from_secs(60))
        .route_index(1)
        .build();

    let layer = RateLimitLayer::new(backend.clone() as Arc<dyn Backend>, vec![tight, loose]);
    let inner_calls = Arc::new(AtomicUsize::new(0));
    let mut service = layer.layer(CountingInner {
        calls: Arc::clone(&inner_calls),
    });

    let request = FixedRequest { client: "10.0.0.1" };

    let first = service
        .ready()
        .await
        .unwrap()
        .call(request.clone())
        .await
        .unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(inner_calls.load(Ordering::SeqCst), 1);

    let second = service.ready().await.unwrap().call(request).await.unwrap();
    assert_eq!(second.status, 429);
    // Rejected by the tight policy before the inner service was reached.
    assert_eq!(inner_calls.load(Ordering::SeqCst), 1);

    // Only the tight policy's counter was ever touched on the second call;
    // the loose policy's key was only written once, by the first request.
    let stats = backend.get_stats();
    assert_eq!(stats.total_keys, 2);
}
