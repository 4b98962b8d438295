//! The [`Decision`] returned from every `check_limit` call.

/// The outcome of a single `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// `0` means admitted; a positive value is how long (in milliseconds)
    /// the caller should wait before retrying.
    pub retry_after_ms: u64,
    /// The counter value after this attempt. Informational only; callers
    /// must not assume it is monotonically increasing across backends.
    pub current_count: u64,
}

impl Decision {
    /// Builds an admitted decision.
    pub fn admit(current_count: u64) -> Self {
        Self {
            retry_after_ms: 0,
            current_count,
        }
    }

    /// Builds a rejected decision with the given wait time.
    pub fn reject(retry_after_ms: u64, current_count: u64) -> Self {
        debug_assert!(retry_after_ms > 0, "a rejection must carry a wait time");
        Self {
            retry_after_ms,
            current_count,
        }
    }

    /// Returns `true` if the request was admitted.
    pub fn is_admitted(&self) -> bool {
        self.retry_after_ms == 0
    }

    /// Returns `true` if the request was rejected.
    pub fn is_rejected(&self) -> bool {
        !self.is_admitted()
    }

    /// Seconds to report in a `Retry-After` header, rounded up.
    pub fn retry_after_seconds(&self) -> u64 {
        self.retry_after_ms.div_ceil(1000)
    }
}
