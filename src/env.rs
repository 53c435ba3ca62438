//! The environment contract (spec §6). Everything the core *consumes* but
//! does not own -- the grid, the spatial index, stockpiles, production,
//! vision -- is specified here as a trait boundary. A real host implements
//! `Environment`; tests use a small in-memory fake (see `tests::fixtures`).
//!
//! Split into narrow sub-traits the way the teacher splits `specs::SystemData`
//! into one struct per system -- here, one trait per concern, since there is
//! no ECS storage to borrow-check against.

use crate::domain::{AgentId, Bottleneck, BuildingKind, Resource, Stance, TeamId, ThingKind, UnitClass};
use crate::geometry::Position;

/// Grid and terrain queries.
pub trait GridQuery {
    fn is_valid_pos(&self, pos: Position) -> bool;
    fn is_empty(&self, pos: Position) -> bool;
    fn can_place(&self, pos: Position) -> bool;
    fn has_door(&self, pos: Position) -> bool;
    fn is_buildable_terrain(&self, pos: Position) -> bool;
    fn is_water(&self, pos: Position) -> bool;
    fn is_revealed(&self, team: TeamId, pos: Position) -> bool;
    fn map_border(&self) -> u32;
    fn map_width(&self) -> u32;
    fn map_height(&self) -> u32;
}

/// Iteration over things of a given kind, and the spatial index used to
/// bound radius queries without scanning the whole map.
pub trait SpatialQuery {
    fn things_of_kind(&self, kind: ThingKind) -> Vec<Position>;
    fn thing_is_damaged(&self, pos: Position) -> bool;
    fn nearby_agents(&self, team_mask: u64, center: Position, radius: u32) -> Vec<AgentId>;
    fn buildings_of_kind(&self, team: TeamId, kind: BuildingKind) -> Vec<Position>;
    fn building_count(&self, team: TeamId, kind: BuildingKind) -> u32 {
        self.buildings_of_kind(team, kind).len() as u32
    }
    fn nearest_enemy(&self, team: TeamId, center: Position, radius: u32) -> Option<AgentId>;
    fn enemies_in_radius(&self, team: TeamId, center: Position, radius: u32) -> Vec<AgentId>;
}

/// Per-agent queries (position, team, health, inventory, ...).
pub trait AgentQuery {
    fn position(&self, agent: AgentId) -> Option<Position>;
    fn is_alive(&self, agent: AgentId) -> bool;
    fn team_id(&self, agent: AgentId) -> Option<TeamId>;
    fn team_mask(&self, team: TeamId) -> u64;
    fn same_team(&self, a: AgentId, b: AgentId) -> bool;
    fn stance(&self, agent: AgentId) -> Stance;
    fn unit_class(&self, agent: AgentId) -> UnitClass;
    fn last_attacked_step(&self, agent: AgentId) -> u32;
    fn hp_ratio(&self, agent: AgentId) -> f32;
    fn max_hp(&self, agent: AgentId) -> f32;
    fn home_altar(&self, agent: AgentId) -> Option<Position>;
    fn is_settler(&self, agent: AgentId) -> bool;
    fn settler_target(&self, agent: AgentId) -> Option<Position>;
    fn settler_arrived(&self, agent: AgentId) -> bool;
    fn carrying(&self, agent: AgentId) -> Option<(Resource, u32)>;
    fn observation_radius(&self) -> u32;
    fn is_idle(&self, agent: AgentId) -> bool;
}

/// Stockpile, flow, and production queries.
pub trait EconomyQuery {
    fn stockpile_count(&self, team: TeamId, resource: Resource) -> u32;
    fn can_spend_stockpile(&self, team: TeamId, costs: &[(Resource, u32)]) -> bool;
    fn can_afford_build(&self, agent: AgentId, building: BuildingKind) -> bool;
    fn flow_rate(&self, team: TeamId, resource: Resource) -> f32;
    fn current_bottleneck(&self, team: TeamId) -> Bottleneck;
    fn try_batch_queue_train(&mut self, building: BuildingKind, team: TeamId, batch_size: u32) -> bool;
    fn pop_cap_needs_relief(&self, team: TeamId) -> bool;
}

/// Construction helpers the environment performs on the core's behalf.
pub trait ConstructionOps {
    fn try_build_if_missing(&mut self, agent: AgentId, kind: BuildingKind) -> bool;
    fn try_build_near_resource(&mut self, agent: AgentId, kind: BuildingKind, near: Position) -> bool;
    fn try_build_camp_threshold(&mut self, agent: AgentId, kind: BuildingKind) -> bool;
    fn go_to_adjacent_and_build(&mut self, agent: AgentId, pos: Position, kind: BuildingKind) -> bool;
    fn place_starting_town_center(&mut self, team: TeamId, near_altar: Position) -> bool;
    fn place_starting_resource_buildings(&mut self, team: TeamId, near_altar: Position);
    /// Place a new altar for `team` at `pos` and return whether it succeeded.
    /// A successful call deducts `settlement::TOWN_SPLIT_WOOD_COST` from the
    /// team's wood stockpile internally as part of the same operation; a
    /// failed call (blocked tile, insufficient wood, etc.) must leave the
    /// stockpile untouched — callers such as `Settlement::found_town` check
    /// affordability up front but rely on this method never deducting wood
    /// without also placing the altar, and never placing the altar without
    /// deducting it.
    fn place_altar(&mut self, team: TeamId, pos: Position) -> bool;
}

/// Current step and global config.
pub trait ClockQuery {
    fn current_step(&self) -> u32;
    fn max_steps(&self) -> u32;
}

/// Settlement/town-split mutation hooks (spec §4.8, §3 invariants on
/// settler/altar bookkeeping).
pub trait SettlementOps {
    fn villagers_at_altar(&self, team: TeamId, altar: Position) -> Vec<AgentId>;
    fn mark_settler(&mut self, agent: AgentId, target: Position);
    fn clear_settler(&mut self, agent: AgentId);
    fn set_home_altar(&mut self, agent: AgentId, altar: Position);
    fn adjust_altar_population(&mut self, altar: Position, delta: i32);
    fn altar_population(&self, altar: Position) -> u32;
    fn friendly_altars(&self, team: TeamId) -> Vec<Position>;
    fn enemy_altars(&self, team: TeamId) -> Vec<Position>;
}

/// The full environment contract; a blanket implementation ties the
/// sub-traits together for callers that want one bound.
pub trait Environment:
    GridQuery + SpatialQuery + AgentQuery + EconomyQuery + ConstructionOps + ClockQuery + SettlementOps
{
}

impl<T> Environment for T where
    T: GridQuery + SpatialQuery + AgentQuery + EconomyQuery + ConstructionOps + ClockQuery + SettlementOps
{
}
