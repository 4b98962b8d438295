//! The process-wide backend singleton.
//!
//! A convenience shim for call sites that don't want to thread an
//! `Arc<dyn Backend>` through every layer by hand. [`Evaluator`] and the
//! Tower adapter both also accept an explicit backend; dependency
//! injection is the primary path, and this registry exists for the cases
//! where it isn't practical.
//!
//! [`Evaluator`]: crate::evaluator::Evaluator

use ratekeeper_core::Backend;
use std::sync::{Arc, OnceLock, RwLock};

static LIMITER: OnceLock<RwLock<Option<Arc<dyn Backend>>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Arc<dyn Backend>>> {
    LIMITER.get_or_init(|| RwLock::new(None))
}

/// Installs `backend` as the process-wide limiter.
///
/// If a backend was already configured, it is `shutdown` after the new
/// backend is installed, so in-flight `check_limit` calls against the old
/// backend are not disrupted. They hold their own `Arc` clone, taken
/// before this call swaps the slot.
pub async fn configure_limiter(backend: Arc<dyn Backend>) {
    let previous = slot().write().unwrap().replace(backend);
    if let Some(previous) = previous {
        previous.shutdown().await;
    }
}

/// Returns the currently configured backend, if any.
pub fn current_limiter() -> Option<Arc<dyn Backend>> {
    slot().read().unwrap().clone()
}

/// Removes the configured backend, shutting it down first.
pub async fn clear_limiter() {
    let previous = slot().write().unwrap().take();
    if let Some(previous) = previous {
        previous.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ratekeeper_core::{BackendError, Decision};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TrackedBackend {
        shut_down: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Backend for TrackedBackend {
        async fn check_limit(
            &self,
            _key: &str,
            _times: u64,
            _window_ms: u64,
        ) -> Result<Decision, BackendError> {
            Ok(Decision::admit(1))
        }
        fn is_connected(&self) -> bool {
            true
        }
        async fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn reconfiguring_shuts_down_the_previous_backend() {
        let first_shut_down = Arc::new(AtomicBool::new(false));
        let first = Arc::new(TrackedBackend {
            shut_down: Arc::clone(&first_shut_down),
        });
        configure_limiter(first).await;

        let second = Arc::new(TrackedBackend {
            shut_down: Arc::new(AtomicBool::new(false)),
        });
        configure_limiter(second).await;

        assert!(first_shut_down.load(Ordering::SeqCst));
        assert!(current_limiter().is_some());

        clear_limiter().await;
        assert!(current_limiter().is_none());
    }
}
