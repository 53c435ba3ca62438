//! Generation-stamped cache wrapper (spec §4.1).
//!
//! Instead of clearing a map/array every step, each entry is stamped with the
//! generation it was written in; `reset` bumps the wrapper's generation in
//! O(1), and any entry whose stamp doesn't match the current generation is
//! treated as missing. This is the same trick `PathfindingCache` (§4.1, see
//! `crate::pathfinding`) uses for its per-cell scratch arrays, generalized
//! here into a reusable keyed cache for per-agent and per-team values.

use std::collections::HashMap;
use std::hash::Hash;

use log::warn;

use crate::domain::{AgentId, TeamId};

/// Lifecycle phase a wrapper moves through. `reset` is only valid from
/// `Allocated` or `Active`; calling it from `Unallocated`/`Cleaned` is a
/// caller bug, logged and ignored rather than panicking (spec §7: the core
/// never panics).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    Unallocated,
    Allocated,
    Active,
    Cleaned,
}

/// A keyed, generation-stamped cache. `K = ()` gives a scalar cache with a
/// single implicit key.
pub struct GenerationalCache<K, V> {
    phase: LifecyclePhase,
    generation: u32,
    entries: HashMap<K, (u32, V)>,
}

pub type ScalarCache<V> = GenerationalCache<(), V>;
pub type PerAgentCache<V> = GenerationalCache<AgentId, V>;
pub type PerTeamCache<V> = GenerationalCache<TeamId, V>;

impl<K: Eq + Hash + Copy, V> Default for GenerationalCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Copy, V> GenerationalCache<K, V> {
    pub fn new() -> Self {
        Self { phase: LifecyclePhase::Unallocated, generation: 0, entries: HashMap::new() }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Transition `Unallocated -> Allocated`, reserving backing storage.
    pub fn alloc(&mut self, capacity_hint: usize) {
        self.entries.reserve(capacity_hint);
        self.phase = LifecyclePhase::Allocated;
    }

    /// Bump the generation counter, invalidating every previously-stored
    /// entry in O(1). Requires `phase` to already be `Allocated` or `Active`;
    /// a caller that resets before allocating is logged and the call is a
    /// no-op except for the phase-to-Active transition once allocated.
    pub fn reset(&mut self) {
        match self.phase {
            LifecyclePhase::Allocated | LifecyclePhase::Active => {
                self.generation = self.generation.wrapping_add(1);
                self.phase = LifecyclePhase::Active;
            }
            LifecyclePhase::Unallocated => {
                warn!("GenerationalCache::reset called before alloc; ignoring");
            }
            LifecyclePhase::Cleaned => {
                warn!("GenerationalCache::reset called after cleanup; ignoring");
            }
        }
    }

    /// Transition to `Cleaned` and release backing storage.
    pub fn cleanup(&mut self) {
        self.entries.clear();
        self.entries.shrink_to_fit();
        self.phase = LifecyclePhase::Cleaned;
    }

    /// An entry is valid iff its stored generation equals the current one.
    pub fn is_valid(&self, key: &K) -> bool {
        self.entries.get(key).is_some_and(|(gen, _)| *gen == self.generation)
    }

    /// Compute-on-miss: returns the valid cached value, or computes, stores,
    /// and returns a fresh one. `compute` runs at most once per miss.
    pub fn get(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        let generation = self.generation;
        let needs_compute = !self.entries.get(&key).is_some_and(|(gen, _)| *gen == generation);
        if needs_compute {
            self.entries.insert(key, (generation, compute()));
        }
        &self.entries.get(&key).expect("just inserted or already valid").1
    }

    /// Unconditionally store a fresh value, stamped with the current generation.
    pub fn set(&mut self, key: K, value: V) {
        let generation = self.generation;
        self.entries.insert(key, (generation, value));
    }

    /// Drop a single entry regardless of its stamp.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Peek without triggering computation; `None` on miss or stale entry.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).filter(|(gen, _)| *gen == self.generation).map(|(_, v)| v)
    }
}

impl<V> GenerationalCache<(), V> {
    pub fn get_scalar(&mut self, compute: impl FnOnce() -> V) -> &V {
        self.get((), compute)
    }

    pub fn set_scalar(&mut self, value: V) {
        self.set((), value)
    }

    pub fn is_scalar_valid(&self) -> bool {
        self.is_valid(&())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_computes_once_per_generation() {
        let mut cache: PerAgentCache<i32> = PerAgentCache::new();
        cache.alloc(4);
        cache.reset();

        let mut calls = 0;
        let agent = AgentId(1);
        {
            let v = cache.get(agent, || {
                calls += 1;
                42
            });
            assert_eq!(*v, 42);
        }
        let _ = cache.get(agent, || {
            calls += 1;
            99
        });
        assert_eq!(calls, 1, "compute must run at most once per generation (spec §8 idempotence law)");
    }

    #[test]
    fn reset_invalidates_stale_entries() {
        let mut cache: PerAgentCache<i32> = PerAgentCache::new();
        cache.alloc(4);
        cache.reset();
        let agent = AgentId(7);
        cache.set(agent, 5);
        assert!(cache.is_valid(&agent));
        cache.reset();
        assert!(!cache.is_valid(&agent), "reset must invalidate entries stamped with the old generation");
    }

    #[test]
    fn reset_before_alloc_is_a_noop_not_a_panic() {
        let mut cache: ScalarCache<i32> = ScalarCache::new();
        cache.reset();
        assert_eq!(cache.phase(), LifecyclePhase::Unallocated);
    }

    #[test]
    fn invalidate_removes_regardless_of_generation() {
        let mut cache: PerTeamCache<i32> = PerTeamCache::new();
        cache.alloc(1);
        cache.reset();
        let team = TeamId(0);
        cache.set(team, 1);
        cache.invalidate(&team);
        assert!(!cache.is_valid(&team));
    }
}
