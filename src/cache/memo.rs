//! Optional wall-clock memoization companion (spec §4.1): for computations
//! whose validity is governed by real time rather than step count. Not
//! driven by the per-step generation counter, so it survives across ticks
//! until `max_age` elapses.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TimeBoundCache<K, V> {
    max_age: Duration,
    cleanup_interval: Duration,
    last_cleanup: Instant,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash + Clone, V: Clone> TimeBoundCache<K, V> {
    pub fn new() -> Self {
        Self::with_ages(Duration::from_secs(1), Duration::from_secs(5))
    }

    pub fn with_ages(max_age: Duration, cleanup_interval: Duration) -> Self {
        Self { max_age, cleanup_interval, last_cleanup: Instant::now(), entries: HashMap::new() }
    }

    /// Returns the cached value if it's within `max_age`, else recomputes,
    /// stores, and returns the fresh value.
    pub fn get(&mut self, key: K, compute: impl FnOnce() -> V) -> V {
        self.maybe_cleanup();
        let now = Instant::now();
        if let Some((stamped, value)) = self.entries.get(&key) {
            if now.duration_since(*stamped) <= self.max_age {
                return value.clone();
            }
        }
        let value = compute();
        self.entries.insert(key, (now, value.clone()));
        value
    }

    fn maybe_cleanup(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_cleanup) < self.cleanup_interval {
            return;
        }
        let max_age = self.max_age;
        self.entries.retain(|_, (stamped, _)| now.duration_since(*stamped) <= max_age);
        self.last_cleanup = now;
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for TimeBoundCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_computes_once_within_max_age() {
        let mut cache: TimeBoundCache<&str, i32> = TimeBoundCache::with_ages(Duration::from_secs(60), Duration::from_secs(60));
        let mut calls = 0;
        cache.get("k", || {
            calls += 1;
            1
        });
        cache.get("k", || {
            calls += 1;
            2
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn get_recomputes_after_max_age_elapses() {
        let mut cache: TimeBoundCache<&str, i32> = TimeBoundCache::with_ages(Duration::from_millis(1), Duration::from_secs(60));
        cache.get("k", || 1);
        std::thread::sleep(Duration::from_millis(5));
        let value = cache.get("k", || 2);
        assert_eq!(value, 2);
    }
}
