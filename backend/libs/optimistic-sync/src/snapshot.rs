//! Pre-mutation capture and rollback

use crate::rules::KeyPlan;
use query_cache::{CacheKey, QueryCache};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Value of one key at capture time
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    /// Key was not materialized; restoring evicts it
    Absent,
    Present(Value),
}

/// Captured values for a key set, owned by one mutation lifecycle
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: Vec<(CacheKey, Captured)>,
    restored: bool,
}

impl Snapshot {
    /// Capture the given keys; missing keys are recorded as `Absent`
    pub fn begin(cache: &QueryCache, keys: &[CacheKey]) -> Self {
        let mut seen = HashSet::new();
        let entries = keys
            .iter()
            .filter(|key| seen.insert((*key).clone()))
            .map(|key| {
                let captured = match cache.get(key) {
                    Some(value) => Captured::Present(value.data),
                    None => Captured::Absent,
                };
                (key.clone(), captured)
            })
            .collect();

        Self {
            entries,
            restored: false,
        }
    }

    /// Capture a rule's exact keys plus every materialized collection key it touches
    pub fn capture(cache: &QueryCache, plan: &KeyPlan) -> Self {
        let mut keys = plan.exact.clone();
        for selector in &plan.collections {
            keys.extend(cache.keys_matching(selector));
        }
        Self::begin(cache, &keys)
    }

    /// Keep only the entries for `changed`; the rest are released so a
    /// rollback never rewrites a key the apply left alone.
    pub fn retain_changed(&mut self, changed: &[CacheKey]) {
        self.entries.retain(|(key, _)| changed.contains(key));
    }

    /// Write every captured value back verbatim.
    ///
    /// Returns `false` when the snapshot was already restored; the second
    /// call writes nothing.
    pub fn restore(&mut self, cache: &QueryCache) -> bool {
        if self.restored {
            return false;
        }
        self.restored = true;

        let writes = self
            .entries
            .iter()
            .map(|(key, captured)| {
                let value = match captured {
                    Captured::Present(data) => Some(data.clone()),
                    Captured::Absent => None,
                };
                (key.clone(), value)
            })
            .collect();
        cache.write_many(writes);

        debug!(keys = self.entries.len(), "Snapshot restored");
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn captured(&self, key: &CacheKey) -> Option<&Captured> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, captured)| captured)
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
