//! The per-step cache substrate (spec §4.1): generation-stamped wrappers
//! that give O(1) "reset" instead of clearing a collection, plus the agent
//! lifecycle tracker and an optional wall-clock memoization companion.

mod lifecycle;
mod memo;
mod wrapper;

pub use lifecycle::AgentLifecycleTracker;
pub use memo::TimeBoundCache;
pub use wrapper::{GenerationalCache, LifecyclePhase, PerAgentCache, PerTeamCache, ScalarCache};
