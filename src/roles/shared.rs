//! Behaviors referenced by name from more than one role catalog (spec
//! §4.5 item 3/5/10, §4.6 item 2/13, §4.7's shared-behavior list):
//! `EmergencyHeal`, `MarketTrade`, `StoreValuables`, `SmeltGold`,
//! `CraftBread`, `PlantOnFertile`, `FallbackSearch`. Also the movement
//! helper every catalog leans on to turn a target position into a `Move`
//! action via the shared pathfinding cache.

use crate::action::{Action, Verb};
use crate::domain::{BuildingKind, Resource, ThingKind};
use crate::env::Environment;
use crate::geometry::{Direction, Position, SpiralSearch};
use crate::options::OptionDef;
use crate::roles::RoleCtx;

pub const FALLBACK_SEARCH_RADIUS: u32 = 12;
/// Minimum gold stockpile before `SmeltGold`/`MarketTrade` consider selling it off.
pub const GOLD_RESERVE_FLOOR: u32 = 20;
pub const HEARTS_LOW_THRESHOLD: u32 = 10;

/// Step one tile toward `target` along the cached A* path, or `NOOP` if
/// unreachable (spec §7: an unreachable target degrades to no-op so the
/// arbitration loop falls through, never panics).
pub fn step_towards<E: Environment>(ctx: &mut RoleCtx<'_, E>, target: Position) -> Action {
    let pos = ctx.position();
    if pos == target {
        return Action::NOOP;
    }
    match ctx.pathfinding.find_path(&*ctx.env, pos, &[target]) {
        Some(path) if path.len() > 1 => match Direction::towards(pos, path[1]) {
            Some(dir) => Action::new(Verb::Move, dir.index()),
            None => Action::NOOP,
        },
        _ => Action::NOOP,
    }
}

/// `act` helper shared by every "go stand next to X and do Y" option: move
/// while farther than one tile, otherwise emit `on_arrive`.
pub fn approach_then<E: Environment>(ctx: &mut RoleCtx<'_, E>, target: Position, on_arrive: Action) -> Action {
    if ctx.position().chebyshev_distance(target) <= 1 {
        on_arrive
    } else {
        step_towards(ctx, target)
    }
}

pub fn nearest<'a>(from: Position, candidates: &'a [Position]) -> Option<&'a Position> {
    candidates.iter().min_by_key(|p| from.chebyshev_distance(**p))
}

/// Non-interruptible: move toward home altar once a threat is reported
/// against the current agent via `Flee`-style options upstream; shared by
/// gatherer/builder "emergency heal" entries (spec §4.5 item 3, §4.6 item 2).
pub struct EmergencyHeal;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for EmergencyHeal {
    fn name(&self) -> &'static str {
        "EmergencyHeal"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.hp_ratio(ctx.agent) <= 0.33 && matches!(ctx.env.carrying(ctx.agent), Some((Resource::Food, n)) if n > 0)
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if self.can_start(ctx) {
            Action::new(Verb::Use, 0)
        } else {
            Action::NOOP
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Trade gold for the team's current bottleneck resource at a Market.
pub struct MarketTrade;

impl<E: Environment> MarketTrade {
    fn market(ctx: &RoleCtx<'_, E>) -> Option<Position> {
        let markets = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Market);
        nearest(ctx.position(), &markets).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for MarketTrade {
    fn name(&self) -> &'static str {
        "MarketTrade"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.current_bottleneck(ctx.team) != crate::domain::Bottleneck::None
            && ctx.env.stockpile_count(ctx.team, Resource::Gold) > GOLD_RESERVE_FLOOR
            && Self::market(ctx).is_some()
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::market(ctx) {
            Some(market) => approach_then(ctx, market, Action::new(Verb::Use, 1)),
            None => Action::NOOP,
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Deposit carried valuables (gold) at the nearest friendly stockpile
/// building once the agent isn't actively needed elsewhere.
pub struct StoreValuables;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for StoreValuables {
    fn name(&self) -> &'static str {
        "StoreValuables"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        matches!(ctx.env.carrying(ctx.agent), Some((Resource::Gold, n)) if n > 0)
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let dropoffs = ctx.env.buildings_of_kind(ctx.team, BuildingKind::TownCenter);
        match nearest(ctx.position(), &dropoffs) {
            Some(&dropoff) => approach_then(ctx, dropoff, Action::new(Verb::Put, 0)),
            None => Action::NOOP,
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Convert raw gold into bars at the Blacksmith.
pub struct SmeltGold;

impl<E: Environment> SmeltGold {
    fn blacksmith(ctx: &RoleCtx<'_, E>) -> Option<Position> {
        let forges = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Blacksmith);
        nearest(ctx.position(), &forges).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for SmeltGold {
    fn name(&self) -> &'static str {
        "SmeltGold"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        matches!(ctx.env.carrying(ctx.agent), Some((Resource::Gold, n)) if n > 0) && Self::blacksmith(ctx).is_some()
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::blacksmith(ctx) {
            Some(forge) => approach_then(ctx, forge, Action::new(Verb::Use, 2)),
            None => Action::NOOP,
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Bake wheat into bread at the ClayOven.
pub struct CraftBread;

impl<E: Environment> CraftBread {
    fn oven(ctx: &RoleCtx<'_, E>) -> Option<Position> {
        let ovens = ctx.env.buildings_of_kind(ctx.team, BuildingKind::ClayOven);
        nearest(ctx.position(), &ovens).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for CraftBread {
    fn name(&self) -> &'static str {
        "CraftBread"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        matches!(ctx.env.carrying(ctx.agent), Some((Resource::Food, n)) if n > 0) && Self::oven(ctx).is_some()
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::oven(ctx) {
            Some(oven) => approach_then(ctx, oven, Action::new(Verb::Use, 3)),
            None => Action::NOOP,
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Plant carried wheat/wood on a fertile tile instead of hauling it home.
pub struct PlantOnFertile;

impl<E: Environment> PlantOnFertile {
    fn fertile_tile(ctx: &RoleCtx<'_, E>) -> Option<Position> {
        let tiles = ctx.env.things_of_kind(ThingKind::Fertile);
        nearest(ctx.position(), &tiles).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for PlantOnFertile {
    fn name(&self) -> &'static str {
        "PlantOnFertile"
    }

    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let carrying_plantable = matches!(ctx.env.carrying(ctx.agent), Some((Resource::Food, _)) | Some((Resource::Wood, _)));
        carrying_plantable && ctx.state.gatherer_task != Some(crate::agent_state::GathererTask::Hearts) && Self::fertile_tile(ctx).is_some()
    }

    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::fertile_tile(ctx) {
            Some(tile) => approach_then(ctx, tile, Action::new(Verb::PlantResource, 0)),
            None => Action::NOOP,
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

/// Deterministic spiral wander used as the last-resort entry of every
/// catalog (spec §4.5/§4.6/§4.7 "Fallback search (spiral wander)").
pub struct FallbackSearch;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for FallbackSearch {
    fn name(&self) -> &'static str {
        "FallbackSearch"
    }

    fn can_start(&self, _ctx: &RoleCtx<'_, E>) -> bool {
        true
    }

    fn should_terminate(&self, _ctx: &RoleCtx<'_, E>) -> bool {
        false
    }

    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let center = ctx.position();
        let cursor = ctx.state.spiral_cursor;
        let candidate = SpiralSearch::new(center, FALLBACK_SEARCH_RADIUS)
            .enumerate()
            .find(|(i, pos)| *i as u32 >= cursor && ctx.env.is_valid_pos(*pos) && ctx.env.is_empty(*pos));
        match candidate {
            Some((i, pos)) => {
                ctx.state.spiral_cursor = i as u32 + 1;
                step_towards(ctx, pos)
            }
            None => {
                ctx.state.spiral_cursor = 0;
                Action::NOOP
            }
        }
    }

    fn interruptible(&self) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) mod test_env {
    //! A minimal in-memory `Environment` fixture shared by the role-catalog
    //! test modules below.
    use std::collections::HashMap;

    use crate::domain::*;
    use crate::env::*;
    use crate::geometry::Position;

    pub struct FakeEnv {
        pub width: i32,
        pub height: i32,
        pub blocked: Vec<Position>,
        pub positions: HashMap<AgentId, Position>,
        pub teams: HashMap<AgentId, TeamId>,
        pub hp_ratio: HashMap<AgentId, f32>,
        pub carrying: HashMap<AgentId, (Resource, u32)>,
        pub stockpiles: HashMap<(TeamId, Resource), u32>,
        pub bottleneck: Bottleneck,
        pub things: HashMap<ThingKind, Vec<Position>>,
        pub buildings: HashMap<(TeamId, BuildingKind), Vec<Position>>,
        pub step: u32,
        pub stance: HashMap<AgentId, Stance>,
        pub unit_class: HashMap<AgentId, UnitClass>,
        pub last_attacked: HashMap<AgentId, u32>,
    }

    impl FakeEnv {
        pub fn new() -> Self {
            Self {
                width: 64,
                height: 64,
                blocked: Vec::new(),
                positions: HashMap::new(),
                teams: HashMap::new(),
                hp_ratio: HashMap::new(),
                carrying: HashMap::new(),
                stockpiles: HashMap::new(),
                bottleneck: Bottleneck::None,
                things: HashMap::new(),
                buildings: HashMap::new(),
                step: 0,
                stance: HashMap::new(),
                unit_class: HashMap::new(),
                last_attacked: HashMap::new(),
            }
        }

        pub fn place(&mut self, agent: AgentId, team: TeamId, pos: Position) {
            self.positions.insert(agent, pos);
            self.teams.insert(agent, team);
        }
    }

    impl GridQuery for FakeEnv {
        fn is_valid_pos(&self, pos: Position) -> bool {
            pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
        }
        fn is_empty(&self, pos: Position) -> bool {
            !self.blocked.contains(&pos)
        }
        fn can_place(&self, _pos: Position) -> bool {
            true
        }
        fn has_door(&self, _pos: Position) -> bool {
            false
        }
        fn is_buildable_terrain(&self, _pos: Position) -> bool {
            true
        }
        fn is_water(&self, _pos: Position) -> bool {
            false
        }
        fn is_revealed(&self, _team: TeamId, _pos: Position) -> bool {
            true
        }
        fn map_border(&self) -> u32 {
            2
        }
        fn map_width(&self) -> u32 {
            self.width as u32
        }
        fn map_height(&self) -> u32 {
            self.height as u32
        }
    }

    impl SpatialQuery for FakeEnv {
        fn things_of_kind(&self, kind: ThingKind) -> Vec<Position> {
            self.things.get(&kind).cloned().unwrap_or_default()
        }
        fn thing_is_damaged(&self, _pos: Position) -> bool {
            false
        }
        fn nearby_agents(&self, _team_mask: u64, _center: Position, _radius: u32) -> Vec<AgentId> {
            Vec::new()
        }
        fn buildings_of_kind(&self, team: TeamId, kind: BuildingKind) -> Vec<Position> {
            self.buildings.get(&(team, kind)).cloned().unwrap_or_default()
        }
        fn nearest_enemy(&self, _team: TeamId, _center: Position, _radius: u32) -> Option<AgentId> {
            None
        }
        fn enemies_in_radius(&self, _team: TeamId, _center: Position, _radius: u32) -> Vec<AgentId> {
            Vec::new()
        }
    }

    impl AgentQuery for FakeEnv {
        fn position(&self, agent: AgentId) -> Option<Position> {
            self.positions.get(&agent).copied()
        }
        fn is_alive(&self, agent: AgentId) -> bool {
            self.positions.contains_key(&agent)
        }
        fn team_id(&self, agent: AgentId) -> Option<TeamId> {
            self.teams.get(&agent).copied()
        }
        fn team_mask(&self, team: TeamId) -> u64 {
            1u64 << (team.0 as u64 % 64)
        }
        fn same_team(&self, a: AgentId, b: AgentId) -> bool {
            self.teams.get(&a) == self.teams.get(&b)
        }
        fn stance(&self, agent: AgentId) -> Stance {
            self.stance.get(&agent).copied().unwrap_or(Stance::Aggressive)
        }
        fn unit_class(&self, agent: AgentId) -> UnitClass {
            self.unit_class.get(&agent).copied().unwrap_or(UnitClass::Villager)
        }
        fn last_attacked_step(&self, agent: AgentId) -> u32 {
            self.last_attacked.get(&agent).copied().unwrap_or(0)
        }
        fn hp_ratio(&self, agent: AgentId) -> f32 {
            self.hp_ratio.get(&agent).copied().unwrap_or(1.0)
        }
        fn max_hp(&self, _agent: AgentId) -> f32 {
            30.0
        }
        fn home_altar(&self, _agent: AgentId) -> Option<Position> {
            None
        }
        fn is_settler(&self, _agent: AgentId) -> bool {
            false
        }
        fn settler_target(&self, _agent: AgentId) -> Option<Position> {
            None
        }
        fn settler_arrived(&self, _agent: AgentId) -> bool {
            false
        }
        fn carrying(&self, agent: AgentId) -> Option<(Resource, u32)> {
            self.carrying.get(&agent).copied()
        }
        fn observation_radius(&self) -> u32 {
            8
        }
        fn is_idle(&self, _agent: AgentId) -> bool {
            true
        }
    }

    impl EconomyQuery for FakeEnv {
        fn stockpile_count(&self, team: TeamId, resource: Resource) -> u32 {
            self.stockpiles.get(&(team, resource)).copied().unwrap_or(0)
        }
        fn can_spend_stockpile(&self, team: TeamId, costs: &[(Resource, u32)]) -> bool {
            costs.iter().all(|(r, n)| self.stockpile_count(team, *r) >= *n)
        }
        fn can_afford_build(&self, _agent: AgentId, _building: BuildingKind) -> bool {
            true
        }
        fn flow_rate(&self, _team: TeamId, _resource: Resource) -> f32 {
            0.0
        }
        fn current_bottleneck(&self, _team: TeamId) -> Bottleneck {
            self.bottleneck
        }
        fn try_batch_queue_train(&mut self, _building: BuildingKind, _team: TeamId, _batch_size: u32) -> bool {
            false
        }
        fn pop_cap_needs_relief(&self, _team: TeamId) -> bool {
            false
        }
    }

    impl ConstructionOps for FakeEnv {
        fn try_build_if_missing(&mut self, _agent: AgentId, _kind: BuildingKind) -> bool {
            true
        }
        fn try_build_near_resource(&mut self, _agent: AgentId, _kind: BuildingKind, _near: Position) -> bool {
            true
        }
        fn try_build_camp_threshold(&mut self, _agent: AgentId, _kind: BuildingKind) -> bool {
            true
        }
        fn go_to_adjacent_and_build(&mut self, _agent: AgentId, _pos: Position, _kind: BuildingKind) -> bool {
            true
        }
        fn place_starting_town_center(&mut self, _team: TeamId, _near_altar: Position) -> bool {
            true
        }
        fn place_starting_resource_buildings(&mut self, _team: TeamId, _near_altar: Position) {}
        fn place_altar(&mut self, _team: TeamId, _pos: Position) -> bool {
            true
        }
    }

    impl ClockQuery for FakeEnv {
        fn current_step(&self) -> u32 {
            self.step
        }
        fn max_steps(&self) -> u32 {
            100_000
        }
    }

    impl SettlementOps for FakeEnv {
        fn villagers_at_altar(&self, _team: TeamId, _altar: Position) -> Vec<AgentId> {
            Vec::new()
        }
        fn mark_settler(&mut self, _agent: AgentId, _target: Position) {}
        fn clear_settler(&mut self, _agent: AgentId) {}
        fn set_home_altar(&mut self, _agent: AgentId, _altar: Position) {}
        fn adjust_altar_population(&mut self, _altar: Position, _delta: i32) {}
        fn altar_population(&self, _altar: Position) -> u32 {
            0
        }
        fn friendly_altars(&self, _team: TeamId) -> Vec<Position> {
            Vec::new()
        }
        fn enemy_altars(&self, _team: TeamId) -> Vec<Position> {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_env::FakeEnv;
    use super::*;
    use crate::coordination::TeamCoordination;
    use crate::difficulty::DifficultyConfig;
    use crate::domain::{AgentId, TeamId};
    use crate::pathfinding::PathfindingCache;
    use rand::SeedableRng;

    fn ctx<'a>(
        env: &'a mut FakeEnv,
        state: &'a mut crate::agent_state::AgentState,
        coordination: &'a mut TeamCoordination,
        difficulty: &'a DifficultyConfig,
        rng: &'a mut rand::rngs::SmallRng,
        pathfinding: &'a mut PathfindingCache,
        damaged_buildings: &'a crate::roles::builder::DamagedBuildingCache,
        agent: AgentId,
    ) -> RoleCtx<'a, FakeEnv> {
        RoleCtx { env, agent, team: TeamId(0), state, coordination, difficulty, rng, step: 0, pathfinding, damaged_buildings }
    }

    #[test]
    fn emergency_heal_fires_only_below_hp_threshold_with_food() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(0, 0));
        env.hp_ratio.insert(agent, 0.2);
        env.carrying.insert(agent, (Resource::Food, 3));
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let c = ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(EmergencyHeal.can_start(&c));
    }

    #[test]
    fn emergency_heal_does_not_fire_at_full_health() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(0, 0));
        env.hp_ratio.insert(agent, 1.0);
        env.carrying.insert(agent, (Resource::Food, 3));
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let c = ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(!EmergencyHeal.can_start(&c));
    }

    #[test]
    fn fallback_search_always_can_start_and_advances_cursor() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(5, 5));
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let mut c = ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(FallbackSearch.can_start(&c));
        let _ = FallbackSearch.act(&mut c);
        assert!(c.state.spiral_cursor > 0, "act should advance the spiral cursor so repeated calls fan outward");
    }
}
