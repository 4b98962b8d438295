//! The [`Backend`] trait: the common interface the local, remote, and
//! composite backends all implement, and the one the Evaluator and the
//! Tower adapter depend on.

use crate::error::BackendError;
use crate::Decision;
use async_trait::async_trait;

/// A fixed-window counter backend.
///
/// `connect`/`disconnect` are intentionally *not* part of this trait: each
/// concrete backend takes a different config type to connect with (a Redis
/// URL, a cleanup interval, ...), so those stay inherent methods on the
/// concrete type. What every backend, and every caller that only holds an
/// `Arc<dyn Backend>` (the composite backend, the registry, the Tower
/// adapter), needs is `check_limit`, a liveness check, and a
/// framework-agnostic way to release resources.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Atomically increments the counter for `key` and decides whether the
    /// request is admitted, per the fixed-window algorithm.
    async fn check_limit(&self, key: &str, times: u64, window_ms: u64)
        -> Result<Decision, BackendError>;

    /// Returns whether the backend currently holds a usable connection (or,
    /// for the local backend, is simply always `true` once constructed).
    fn is_connected(&self) -> bool;

    /// Releases any resources (connections, background tasks) held by this
    /// backend. Idempotent. After `shutdown` returns, `check_limit` must
    /// return `BackendError::NotConnected`.
    async fn shutdown(&self);
}
