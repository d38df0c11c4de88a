use std::{collections::HashMap, hash::Hash, time::Duration};

/// Per-key exponential backoff.
///
/// Each consecutive failure of a key doubles its delay, up to `max`. A
/// success resets the key.
#[derive(Clone, Debug)]
pub struct Backoff<K> {
    initial: Duration,
    max: Duration,
    delays: HashMap<K, Duration>,
}

// === impl Backoff ===

impl<K: Hash + Eq> Default for Backoff<K> {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(5 * 60))
    }
}

impl<K: Hash + Eq> Backoff<K> {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            delays: HashMap::new(),
        }
    }

    /// Returns the delay before the next attempt for `key`.
    pub fn next(&mut self, key: K) -> Duration {
        let delay = self.delays.entry(key).or_insert(self.initial);
        let current = *delay;
        *delay = delay.saturating_mul(2).min(self.max);
        current
    }

    pub fn reset(&mut self, key: &K) {
        self.delays.remove(key);
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}
