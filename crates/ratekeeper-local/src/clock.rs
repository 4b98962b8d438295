//! Monotonic millisecond timestamps relative to a per-backend epoch.
//!
//! `CounterEntry::expires_at_ms` needs a cheap, `Copy`, comparable
//! timestamp, so every [`crate::LocalBackend`] captures one epoch
//! (`tokio::time::Instant`, not `std::time::Instant`) at construction and
//! measures everything else as milliseconds elapsed since it. Using
//! `tokio::time::Instant` means the epoch, and every timestamp measured
//! against it, tracks a paused/auto-advancing runtime clock under
//! `#[tokio::test(start_paused = true)]`, the same clock the reaper's
//! `tokio::time::interval` ticks against, so a test can fast-forward virtual
//! time instead of sleeping and still see consistent expiry decisions.
//!
//! Deliberately per-instance rather than a single process-wide static: two
//! backends (or two tests, paused and unpaused, in the same binary) must not
//! share a clock origin.

use tokio::time::Instant;

/// Captures a fresh epoch for one [`crate::LocalBackend`] instance.
pub(crate) fn epoch() -> Instant {
    Instant::now()
}

/// Milliseconds elapsed since `epoch`.
pub(crate) fn now_ms(epoch: Instant) -> u64 {
    epoch.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn now_ms_is_monotonically_non_decreasing() {
        let epoch = epoch();
        let a = now_ms(epoch);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = now_ms(epoch);
        assert!(b >= a);
    }
}
