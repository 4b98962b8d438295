//! A single lock-protected shard of the counter map.
//!
//! Sharding the map (rather than guarding it with one global lock) is what
//! lets the reaper sweep expired entries without blocking request handlers
//! working a different shard, and keeps per-key mutation serialized without
//! serializing unrelated keys against each other.
//!
//! Every method takes `now` (milliseconds since the owning backend's epoch)
//! as a parameter rather than reading a clock itself, so a single `now`
//! snapshot is shared across however many shards one `check_limit`/reap pass
//! touches.

use crate::entry::CounterEntry;
use ratekeeper_core::Decision;
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) struct Shard {
    entries: Mutex<HashMap<String, CounterEntry>>,
    max_entries: usize,
}

/// Outcome of a capacity-driven eviction, for event emission by the caller.
pub(crate) struct Evicted {
    pub(crate) key: String,
}

impl Shard {
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
        }
    }

    /// Runs the fixed-window increment-and-check algorithm for `key` under
    /// this shard's lock, evicting if the shard is at capacity and `key` is
    /// new. Returns the decision and, if an eviction happened, which key was
    /// evicted (so the caller can emit an event / metric for it).
    pub(crate) fn check_limit(
        &self,
        key: &str,
        times: u64,
        window_ms: u64,
        now: u64,
    ) -> (Decision, Option<Evicted>) {
        let mut entries = self.entries.lock().unwrap();

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_live(now) {
                entry.count += 1;
                let decision = if entry.count > times {
                    Decision::reject(entry.expires_at_ms - now, entry.count)
                } else {
                    Decision::admit(entry.count)
                };
                return (decision, None);
            }
            // Expired: fixed-window reset, new period starts now.
            entry.count = 1;
            entry.expires_at_ms = now + window_ms;
            return (Decision::admit(1), None);
        }

        let evicted = self.make_room(&mut entries, now);
        entries.insert(
            key.to_string(),
            CounterEntry {
                count: 1,
                expires_at_ms: now + window_ms,
            },
        );
        (Decision::admit(1), evicted)
    }

    /// If inserting a new key would push this shard over `max_entries`,
    /// first sweeps expired entries, then (if still full) evicts the entry
    /// with the earliest expiry. Returns the evicted key, if any.
    fn make_room(
        &self,
        entries: &mut HashMap<String, CounterEntry>,
        now: u64,
    ) -> Option<Evicted> {
        if self.max_entries == 0 || entries.len() < self.max_entries {
            return None;
        }

        entries.retain(|_, entry| entry.is_live(now));
        if entries.len() < self.max_entries {
            return None;
        }

        let earliest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at_ms)
            .map(|(key, _)| key.clone());

        if let Some(key) = earliest {
            entries.remove(&key);
            return Some(Evicted { key });
        }
        None
    }

    /// Cooperative reaping: removes expired entries from this shard only,
    /// holding the lock just long enough to do so. Returns how many were
    /// removed.
    pub(crate) fn reap(&self, now: u64) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Live entry count, for `get_stats().total_keys`.
    pub(crate) fn live_count(&self, now: u64) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Raw entry count including not-yet-reaped expired entries, for
    /// `get_stats().total_entries`.
    pub(crate) fn raw_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
