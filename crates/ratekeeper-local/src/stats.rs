//! [`LocalBackendStats`], returned by `LocalBackend::get_stats`.

/// A snapshot of the local backend's counter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBackendStats {
    /// Number of keys with a live (non-expired) entry.
    pub total_keys: usize,
    /// Total number of entries stored, including ones that have expired but
    /// have not yet been swept by the reaper.
    pub total_entries: usize,
}
