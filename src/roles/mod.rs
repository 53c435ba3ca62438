//! Role-specific option catalogs (spec §4.5–§4.7): Gatherer, Builder, Fighter.
//! Each catalog is a fixed, ordered `Vec<Box<dyn OptionDef<RoleCtx<E>>>>`,
//! rebuilt by the controller for each agent it dispatches (the boxed options
//! are zero-sized, so this costs one small allocation per entry, no data
//! copy) and read-only for the duration of that one agent's turn, mirroring
//! the teacher's per-system `SystemData` split (one context struct bundling
//! everything an option needs, borrowed fresh each call) generalized to the
//! spec's flat, non-ECS data model.

pub mod builder;
pub mod fighter;
pub mod gatherer;
pub mod shared;

use rand::rngs::SmallRng;

use crate::agent_state::AgentState;
use crate::coordination::TeamCoordination;
use crate::difficulty::DifficultyConfig;
use crate::domain::{AgentId, TeamId};
use crate::env::Environment;
use crate::pathfinding::PathfindingCache;
use crate::roles::builder::DamagedBuildingCache;

/// Distance within which `Flee`-style options trigger for gatherers.
pub const GATHERER_FLEE_RADIUS: u32 = 6;
/// Distance within which `Flee` triggers for builders (spec §4.6 item 1).
pub const BUILDER_FLEE_RADIUS: u32 = 8;
/// Stance `Defensive` retaliation window (spec §4.7 stance gates).
pub const DEFENSIVE_RETALIATION_WINDOW: u32 = 30;
pub const HEALER_SEEK_RADIUS: u32 = 10;
pub const KITE_TRIGGER_DISTANCE: u32 = 3;
pub const ALLY_THREAT_RADIUS: u32 = 6;
pub const TARGET_SWAP_INTERVAL: u32 = 20;
pub const PATROL_ARRIVAL_THRESHOLD: u32 = 2;
pub const SCOUT_FLEE_RADIUS: u32 = 7;
pub const SCOUT_EXPLORE_GROWTH: u32 = 4;
pub const LANTERN_MIN_SPACING: u32 = 3;
pub const TASK_SWITCH_HYSTERESIS: f32 = 2.0;

/// Everything a role option reads or mutates for one agent, for one tick.
/// Borrowed fresh per agent by `Controller::tick`; no option stores any part
/// of this.
pub struct RoleCtx<'a, E: Environment> {
    pub env: &'a mut E,
    pub agent: AgentId,
    pub team: TeamId,
    pub state: &'a mut AgentState,
    pub coordination: &'a mut TeamCoordination,
    pub difficulty: &'a DifficultyConfig,
    pub rng: &'a mut SmallRng,
    pub step: u32,
    pub pathfinding: &'a mut PathfindingCache,
    /// Per-team damaged-building cache, refreshed at most once per step by
    /// the controller before any agent acts (spec §4.6 item 8).
    pub damaged_buildings: &'a DamagedBuildingCache,
}

impl<'a, E: Environment> RoleCtx<'a, E> {
    pub fn position(&self) -> crate::geometry::Position {
        self.env.position(self.agent).unwrap_or_default()
    }
}
