//! Shared error types for ratekeeper backends.
//!
//! [`BackendError`] is the error every [`crate::Backend`] implementation
//! returns from `check_limit`. [`RateKeeperError<E>`] is an umbrella type a
//! host can use as its own service error so that composing the rate limiter
//! with other Tower middleware needs no manual `From` boilerplate.

use std::fmt;
use thiserror::Error;

/// Errors a [`crate::Backend`] can return from `check_limit`.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend configuration was invalid (zero `times`, zero `window_ms`,
    /// or contradictory options). Always raised at construction time.
    #[error("invalid backend configuration: {reason}")]
    Config {
        /// Human-readable explanation of what was invalid.
        reason: String,
    },

    /// `check_limit` was called before `connect` or after `disconnect`/`shutdown`.
    #[error("backend is not connected")]
    NotConnected,

    /// The backing store is unreachable, timed out, or returned a
    /// structurally invalid result.
    #[error("backend unavailable: {reason}")]
    Unavailable {
        /// Human-readable explanation (network error, timeout, ...).
        reason: String,
    },

    /// The atomic increment procedure (script) returned something outside
    /// its contract. Routed like [`BackendError::Unavailable`] but logged
    /// distinctly so operators can tell a bad deploy of the script apart
    /// from a transient network blip.
    #[error("script error: {reason}")]
    Script {
        /// Human-readable explanation of the parse/contract failure.
        reason: String,
    },
}

impl BackendError {
    /// Returns `true` for the two kinds that a composite backend treats as a
    /// "failure" for circuit-breaker / fail-fast purposes (everything except
    /// [`BackendError::Config`], which can never happen at request time).
    pub fn is_failure(&self) -> bool {
        !matches!(self, BackendError::Config { .. })
    }
}

/// Umbrella error type that wraps every ratekeeper backend error alongside
/// an application error `E`.
///
/// A host stacking this rate limiter with other Tower middleware can use
/// `RateKeeperError<AppError>` as its single service error type and never
/// write a `From<BackendError> for ServiceError` impl by hand.
#[derive(Debug, Clone)]
pub enum RateKeeperError<E> {
    /// The rate limit was exceeded; the caller should wait `retry_after`
    /// (always `Some`, since the local/remote backends always compute a
    /// wait time) before retrying.
    RateLimited {
        /// Milliseconds to wait before retrying.
        retry_after_ms: u64,
    },
    /// The backend itself failed (see [`BackendError`]).
    Backend(BackendError),
    /// The wrapped service returned an application error.
    Application(E),
}

impl<E> fmt::Display for RateKeeperError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKeeperError::RateLimited { retry_after_ms } => {
                write!(f, "rate limited, retry after {retry_after_ms}ms")
            }
            RateKeeperError::Backend(e) => write!(f, "backend error: {e}"),
            RateKeeperError::Application(e) => write!(f, "application error: {e}"),
        }
    }
}

impl<E> std::error::Error for RateKeeperError<E> where E: std::error::Error {}

impl<E> RateKeeperError<E> {
    /// Returns `true` if this is a rate-limited rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RateKeeperError::RateLimited { .. })
    }

    /// Returns `true` if this originated from the backend rather than the
    /// wrapped application.
    pub fn is_backend(&self) -> bool {
        matches!(self, RateKeeperError::Backend(_))
    }

    /// Extracts the application error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            RateKeeperError::Application(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<BackendError> for RateKeeperError<E> {
    fn from(err: BackendError) -> Self {
        RateKeeperError::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestError;

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error")
        }
    }

    impl std::error::Error for TestError {}

    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RateKeeperError<TestError>>();
    };

    #[test]
    fn backend_error_config_is_never_a_routing_failure() {
        let err = BackendError::Config {
            reason: "times must be >= 1".into(),
        };
        assert!(!err.is_failure());
    }

    #[test]
    fn unavailable_and_script_errors_are_routing_failures() {
        assert!(BackendError::Unavailable {
            reason: "timeout".into()
        }
        .is_failure());
        assert!(BackendError::Script {
            reason: "unparseable reply".into()
        }
        .is_failure());
    }

    #[test]
    fn backend_error_converts_into_the_umbrella_type() {
        let err: RateKeeperError<TestError> = BackendError::NotConnected.into();
        assert!(err.is_backend());
    }
}
