//! Builder catalog (spec §4.6): normal and threat-reordered variants, core
//! infrastructure, the tech set, wall-ring placement, and the per-team
//! damaged-building cache.

use crate::action::{Action, Verb};
use crate::domain::{BuildingKind, Resource, ThingKind};
use crate::env::Environment;
use crate::geometry::Position;
use crate::options::OptionDef;
use crate::roles::shared::{approach_then, nearest, CraftBread, EmergencyHeal, FallbackSearch, MarketTrade, PlantOnFertile, StoreValuables};
use crate::roles::{RoleCtx, BUILDER_FLEE_RADIUS};

pub const WALL_RING_BASE_RADIUS: u32 = 6;
pub const WALL_RING_MAX_RADIUS: u32 = 16;
pub const WALL_RING_BUILDINGS_PER_RADIUS: u32 = 5;
pub const WALL_RING_RADIUS_SLACK: u32 = 1;
pub const WALL_RING_MAX_DOORS: u32 = 4;
pub const MILL_NODE_THRESHOLD: usize = 8;
pub const MILL_SCAN_RADIUS: u32 = 4;
pub const MILL_EXCLUSION_RADIUS: u32 = 5;
pub const MILL_MIN_DISTANCE_FROM_ALTAR: u32 = 10;
pub const DAMAGED_BUILDING_CACHE_CAPACITY: usize = 32;
pub const SCARCE_RESOURCE_THRESHOLD: u32 = 5;
pub const PLANT_MILL_THRESHOLD: u32 = 2;

/// Per-team cache of damaged-building positions, rebuilt at most once per
/// step (spec §4.6: "iterate ... once per step, recording up to 32 damaged
/// positions per team").
#[derive(Default)]
pub struct DamagedBuildingCache {
    step: u32,
    positions: Vec<Position>,
}

impl DamagedBuildingCache {
    pub fn refresh<E: Environment>(&mut self, env: &E, team: crate::domain::TeamId, step: u32, kinds: &[BuildingKind]) {
        if self.step == step && step != 0 {
            return;
        }
        self.step = step;
        self.positions.clear();
        'outer: for kind in kinds {
            for pos in env.buildings_of_kind(team, *kind) {
                if env.thing_is_damaged(pos) {
                    self.positions.push(pos);
                    if self.positions.len() >= DAMAGED_BUILDING_CACHE_CAPACITY {
                        break 'outer;
                    }
                }
            }
        }
    }

    /// Nearest still-damaged position, verifying freshness before returning.
    pub fn nearest_still_damaged<E: Environment>(&self, env: &E, from: Position) -> Option<Position> {
        self.positions.iter().filter(|p| env.thing_is_damaged(**p)).min_by_key(|p| from.chebyshev_distance(**p)).copied()
    }
}

fn nearby_count<E: Environment>(ctx: &RoleCtx<'_, E>, kinds: &[ThingKind], radius: u32) -> usize {
    let pos = ctx.position();
    kinds.iter().flat_map(|k| ctx.env.things_of_kind(*k)).filter(|p| pos.chebyshev_distance(*p) <= radius).count()
}

fn first_missing<E: Environment>(ctx: &RoleCtx<'_, E>, kinds: &[BuildingKind]) -> Option<BuildingKind> {
    kinds.iter().find(|k| ctx.env.building_count(ctx.team, **k) == 0).copied()
}

pub struct Flee;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Flee {
    fn name(&self) -> &'static str {
        "Flee"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.nearest_enemy(ctx.team, ctx.position(), BUILDER_FLEE_RADIUS).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match ctx.env.home_altar(ctx.agent) {
            Some(altar) => crate::roles::shared::step_towards(ctx, altar),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        false
    }
}

pub struct DropOffCarrying;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for DropOffCarrying {
    fn name(&self) -> &'static str {
        "DropOffCarrying"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.carrying(ctx.agent).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let town_centers = ctx.env.buildings_of_kind(ctx.team, BuildingKind::TownCenter);
        match nearest(ctx.position(), &town_centers) {
            Some(&dropoff) => approach_then(ctx, dropoff, Action::new(Verb::Put, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

pub struct PopCapHouse;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for PopCapHouse {
    fn name(&self) -> &'static str {
        "PopCapHouse"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.pop_cap_needs_relief(ctx.team)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if ctx.env.try_build_if_missing(ctx.agent, BuildingKind::House) {
            Action::new(Verb::Build, 0)
        } else {
            Action::NOOP
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// First missing among Granary/LumberCamp/Quarry/MiningCamp (spec §4.6 item 6).
pub struct CoreInfrastructure;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for CoreInfrastructure {
    fn name(&self) -> &'static str {
        "CoreInfrastructure"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        first_missing(ctx, &BuildingKind::CORE_INFRASTRUCTURE).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match first_missing(ctx, &BuildingKind::CORE_INFRASTRUCTURE) {
            Some(kind) if ctx.env.try_build_if_missing(ctx.agent, kind) => Action::new(Verb::Build, 0),
            _ => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Build a Mill near a dense wheat/stubble/fertile cluster that's far from
/// any existing food drop-off (spec §4.6 item 7).
pub struct MillNearResource;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for MillNearResource {
    fn name(&self) -> &'static str {
        "MillNearResource"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let enough_nodes = nearby_count(ctx, &[ThingKind::Wheat, ThingKind::Stubble, ThingKind::Fertile], MILL_SCAN_RADIUS) >= MILL_NODE_THRESHOLD;
        let pos = ctx.position();
        let existing: Vec<Position> = [BuildingKind::Mill, BuildingKind::Granary, BuildingKind::TownCenter]
            .into_iter()
            .flat_map(|k| ctx.env.buildings_of_kind(ctx.team, k))
            .collect();
        let none_nearby = existing.iter().all(|p| pos.chebyshev_distance(*p) > MILL_EXCLUSION_RADIUS);
        let far_from_altar = !ctx.env.home_altar(ctx.agent).is_some_and(|altar| pos.chebyshev_distance(altar) <= MILL_MIN_DISTANCE_FROM_ALTAR);
        enough_nodes && none_nearby && far_from_altar
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if ctx.env.try_build_if_missing(ctx.agent, BuildingKind::Mill) {
            Action::new(Verb::Build, 0)
        } else {
            Action::NOOP
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Plant wheat on a nearby fertile tile once the team already runs at least
/// `PLANT_MILL_THRESHOLD` Mills, ahead of `CampThreshold`/`Repair` in the
/// same priority slot (spec §4.6 item 8). Unlike `PlantOnFertile` this fires
/// regardless of what the builder happens to be carrying.
pub struct PlantIfEnoughMills;

impl PlantIfEnoughMills {
    fn fertile_tile<E: Environment>(ctx: &RoleCtx<'_, E>) -> Option<Position> {
        let tiles = ctx.env.things_of_kind(ThingKind::Fertile);
        nearest(ctx.position(), &tiles).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for PlantIfEnoughMills {
    fn name(&self) -> &'static str {
        "PlantIfEnoughMills"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.building_count(ctx.team, BuildingKind::Mill) >= PLANT_MILL_THRESHOLD && Self::fertile_tile(ctx).is_some()
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

/// Camp threshold builds, reused verbatim from the gatherer catalog's node
/// density rule (spec §4.6 item 8 references §4.5's table).
pub struct CampThreshold {
    pub kind: BuildingKind,
    pub node_kinds: &'static [ThingKind],
    pub threshold: usize,
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for CampThreshold {
    fn name(&self) -> &'static str {
        "CampThreshold"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        nearby_count(ctx, self.node_kinds, crate::roles::gatherer::CAMP_SCAN_RADIUS) >= self.threshold
            && ctx.env.building_count(ctx.team, self.kind) == 0
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if ctx.env.try_build_camp_threshold(ctx.agent, self.kind) {
            Action::new(Verb::Build, 0)
        } else {
            Action::NOOP
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Repair the nearest still-damaged building from the per-team cache
/// (spec §4.6 item 8).
pub struct Repair;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Repair {
    fn name(&self) -> &'static str {
        "Repair"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.damaged_buildings.nearest_still_damaged(ctx.env, ctx.position()).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match ctx.damaged_buildings.nearest_still_damaged(ctx.env, ctx.position()) {
            Some(target) => approach_then(ctx, target, Action::new(Verb::Use, 5)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// First missing of the tech set (spec §4.6 item 9).
pub struct TechBuildings;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for TechBuildings {
    fn name(&self) -> &'static str {
        "TechBuildings"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        first_missing(ctx, &BuildingKind::TECH_SET).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match first_missing(ctx, &BuildingKind::TECH_SET) {
            Some(kind) if ctx.env.try_build_if_missing(ctx.agent, kind) => Action::new(Verb::Build, 0),
            _ => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Consume the highest-priority unfulfilled coordination request of `kind`
/// (spec §4.6 item 10: Defense/Siege response).
pub struct CoordinationResponse {
    pub kind: crate::domain::RequestKind,
    pub build: BuildingKind,
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for CoordinationResponse {
    fn name(&self) -> &'static str {
        "CoordinationResponse"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.coordination.requests.has_unfulfilled(self.kind)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let target = ctx.coordination.requests.find_nearest_protection(ctx.position()).map(|r| r.position);
        let Some(target) = target else {
            return Action::NOOP;
        };
        if ctx.position().chebyshev_distance(target) <= 1 {
            if ctx.env.try_build_if_missing(ctx.agent, self.build) {
                ctx.coordination.requests.mark_fulfilled(self.kind);
                return Action::new(Verb::Build, 0);
            }
        }
        crate::roles::shared::step_towards(ctx, target)
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Adaptive-radius wall ring (spec §4.6 item 11).
pub struct WallRing;

impl WallRing {
    fn radius<E: Environment>(ctx: &RoleCtx<'_, E>) -> u32 {
        let total_buildings: u32 = BuildingKind::CORE_INFRASTRUCTURE
            .iter()
            .chain(BuildingKind::TECH_SET.iter())
            .map(|k| ctx.env.building_count(ctx.team, *k))
            .sum();
        (WALL_RING_BASE_RADIUS + total_buildings / WALL_RING_BUILDINGS_PER_RADIUS).min(WALL_RING_MAX_RADIUS)
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for WallRing {
    fn name(&self) -> &'static str {
        "WallRing"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.home_altar(ctx.agent).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let Some(altar) = ctx.env.home_altar(ctx.agent) else {
            return Action::NOOP;
        };
        let base_radius = Self::radius(ctx);
        let pos = ctx.position();
        let mut best: Option<(u32, u32, Position, bool)> = None; // (blocked_count, dist, pos, is_door)
        let existing_walls = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Wall);
        let existing_doors = ctx.env.building_count(ctx.team, BuildingKind::Door);
        for radius_offset in 0..=WALL_RING_RADIUS_SLACK {
            for radius in [base_radius.saturating_sub(radius_offset), base_radius + radius_offset] {
                for candidate in crate::geometry::SpiralSearch::new(altar, radius).filter(|p| p.chebyshev_distance(altar) == radius) {
                    if !ctx.env.is_valid_pos(candidate) || !ctx.env.is_buildable_terrain(candidate) || ctx.env.is_water(candidate) {
                        continue;
                    }
                    if existing_walls.contains(&candidate) {
                        continue;
                    }
                    let is_door = candidate.on_axis_through(altar);
                    if is_door && existing_doors >= WALL_RING_MAX_DOORS {
                        continue;
                    }
                    let blocked_count = if ctx.env.is_empty(candidate) { 0 } else { 1 };
                    let dist = pos.chebyshev_distance(candidate);
                    let better = match best {
                        None => true,
                        Some((b_blocked, b_dist, _, _)) => (blocked_count, dist) < (b_blocked, b_dist),
                    };
                    if better {
                        best = Some((blocked_count, dist, candidate, is_door));
                    }
                }
            }
        }
        match best {
            Some((_, _, candidate, is_door)) => {
                let kind = if is_door { BuildingKind::Door } else { BuildingKind::Wall };
                if ctx.env.can_afford_build(ctx.agent, kind) {
                    approach_then(ctx, candidate, Action::new(Verb::Build, kind as u8))
                } else {
                    // Can't afford the wall tile right now; fall back to ensuring wood.
                    Action::NOOP
                }
            }
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Gather whichever of food/wood/stone is below the scarce threshold
/// (spec §4.6 item 12).
pub struct GatherScarce;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for GatherScarce {
    fn name(&self) -> &'static str {
        "GatherScarce"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        [Resource::Food, Resource::Wood, Resource::Stone].iter().any(|r| ctx.env.stockpile_count(ctx.team, *r) < SCARCE_RESOURCE_THRESHOLD)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let scarcest = [Resource::Food, Resource::Wood, Resource::Stone]
            .into_iter()
            .min_by_key(|r| ctx.env.stockpile_count(ctx.team, *r));
        let Some(resource) = scarcest else {
            return Action::NOOP;
        };
        let kinds: &[ThingKind] = match resource {
            Resource::Food => &[ThingKind::Wheat],
            Resource::Wood => &[ThingKind::Tree],
            Resource::Stone => &[ThingKind::Stone, ThingKind::Stalagmite],
            Resource::Gold => &[],
        };
        let nodes: Vec<Position> = kinds.iter().flat_map(|k| ctx.env.things_of_kind(*k)).collect();
        match nearest(ctx.position(), &nodes) {
            Some(&node) => approach_then(ctx, node, Action::new(Verb::Use, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

pub struct VisitTradingHub;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for VisitTradingHub {
    fn name(&self) -> &'static str {
        "VisitTradingHub"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !ctx.env.buildings_of_kind(ctx.team, BuildingKind::Market).is_empty()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let markets = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Market);
        match nearest(ctx.position(), &markets) {
            Some(&market) => approach_then(ctx, market, Action::new(Verb::Orient, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Priority-ordered normal builder catalog (spec §4.6).
pub fn catalog<'a, E: Environment + 'a>() -> Vec<Box<dyn OptionDef<RoleCtx<'a, E>> + 'a>> {
    vec![
        Box::new(Flee),
        Box::new(EmergencyHeal),
        Box::new(PlantOnFertile),
        Box::new(DropOffCarrying),
        Box::new(PopCapHouse),
        Box::new(CoreInfrastructure),
        Box::new(MillNearResource),
        Box::new(PlantIfEnoughMills),
        Box::new(CampThreshold { kind: BuildingKind::LumberCamp, node_kinds: &[ThingKind::Tree], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_WOOD_GOLD }),
        Box::new(CampThreshold { kind: BuildingKind::MiningCamp, node_kinds: &[ThingKind::GoldVein], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_WOOD_GOLD }),
        Box::new(CampThreshold { kind: BuildingKind::Quarry, node_kinds: &[ThingKind::Stone, ThingKind::Stalagmite], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_STONE }),
        Box::new(Repair),
        Box::new(TechBuildings),
        Box::new(CoordinationResponse { kind: crate::domain::RequestKind::Defense, build: BuildingKind::Outpost }),
        Box::new(CoordinationResponse { kind: crate::domain::RequestKind::SiegeBuild, build: BuildingKind::SiegeWorkshop }),
        Box::new(WallRing),
        Box::new(GatherScarce),
        Box::new(MarketTrade),
        Box::new(VisitTradingHub),
        Box::new(crate::roles::shared::SmeltGold),
        Box::new(CraftBread),
        Box::new(StoreValuables),
        Box::new(FallbackSearch),
    ]
}

/// Threat-reordered variant: wall-ring, defense/siege response, and repair
/// are promoted above core infrastructure (spec §4.6 heading).
pub fn threat_reordered_catalog<'a, E: Environment + 'a>() -> Vec<Box<dyn OptionDef<RoleCtx<'a, E>> + 'a>> {
    vec![
        Box::new(Flee),
        Box::new(EmergencyHeal),
        Box::new(PlantOnFertile),
        Box::new(DropOffCarrying),
        Box::new(CoordinationResponse { kind: crate::domain::RequestKind::Defense, build: BuildingKind::Outpost }),
        Box::new(CoordinationResponse { kind: crate::domain::RequestKind::SiegeBuild, build: BuildingKind::SiegeWorkshop }),
        Box::new(Repair),
        Box::new(WallRing),
        Box::new(PopCapHouse),
        Box::new(CoreInfrastructure),
        Box::new(MillNearResource),
        Box::new(PlantIfEnoughMills),
        Box::new(CampThreshold { kind: BuildingKind::LumberCamp, node_kinds: &[ThingKind::Tree], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_WOOD_GOLD }),
        Box::new(CampThreshold { kind: BuildingKind::MiningCamp, node_kinds: &[ThingKind::GoldVein], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_WOOD_GOLD }),
        Box::new(CampThreshold { kind: BuildingKind::Quarry, node_kinds: &[ThingKind::Stone, ThingKind::Stalagmite], threshold: crate::roles::gatherer::CAMP_NODE_THRESHOLD_STONE }),
        Box::new(TechBuildings),
        Box::new(GatherScarce),
        Box::new(MarketTrade),
        Box::new(VisitTradingHub),
        Box::new(crate::roles::shared::SmeltGold),
        Box::new(CraftBread),
        Box::new(StoreValuables),
        Box::new(FallbackSearch),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::TeamCoordination;
    use crate::difficulty::DifficultyConfig;
    use crate::domain::{AgentId, TeamId};
    use crate::pathfinding::PathfindingCache;
    use crate::roles::shared::test_env::FakeEnv;
    use rand::SeedableRng;

    fn make_ctx<'a>(
        env: &'a mut FakeEnv,
        state: &'a mut crate::agent_state::AgentState,
        coordination: &'a mut TeamCoordination,
        difficulty: &'a DifficultyConfig,
        rng: &'a mut rand::rngs::SmallRng,
        pathfinding: &'a mut PathfindingCache,
        damaged_buildings: &'a DamagedBuildingCache,
        agent: AgentId,
    ) -> RoleCtx<'a, FakeEnv> {
        RoleCtx { env, agent, team: TeamId(0), state, coordination, difficulty, rng, step: 0, pathfinding, damaged_buildings }
    }

    #[test]
    fn normal_catalog_places_flee_first_and_wall_ring_near_the_end() {
        let catalog = catalog::<FakeEnv>();
        assert_eq!(catalog[0].name(), "Flee");
        let wall_ring_index = catalog.iter().position(|o| o.name() == "WallRing").unwrap();
        let core_index = catalog.iter().position(|o| o.name() == "CoreInfrastructure").unwrap();
        assert!(wall_ring_index > core_index, "normal catalog builds core infrastructure before the wall ring");
    }

    #[test]
    fn threat_reordered_catalog_promotes_wall_ring_above_core_infrastructure() {
        let catalog = threat_reordered_catalog::<FakeEnv>();
        let wall_ring_index = catalog.iter().position(|o| o.name() == "WallRing").unwrap();
        let core_index = catalog.iter().position(|o| o.name() == "CoreInfrastructure").unwrap();
        assert!(wall_ring_index < core_index, "threat-reordered variant must promote the wall ring above core infrastructure");
    }

    #[test]
    fn core_infrastructure_targets_first_missing_in_fixed_order() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(0, 0));
        env.buildings.insert((TeamId(0), BuildingKind::Granary), vec![Position::new(1, 1)]);
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = DamagedBuildingCache::default();
        let c = make_ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert_eq!(first_missing(&c, &BuildingKind::CORE_INFRASTRUCTURE), Some(BuildingKind::LumberCamp));
    }

    #[test]
    fn damaged_building_cache_only_refreshes_once_per_step() {
        let mut env = FakeEnv::new();
        env.buildings.insert((TeamId(0), BuildingKind::Wall), vec![Position::new(2, 2)]);
        let mut cache = DamagedBuildingCache::default();
        cache.refresh(&env, TeamId(0), 5, &[BuildingKind::Wall]);
        assert!(cache.nearest_still_damaged(&env, Position::new(0, 0)).is_none(), "FakeEnv reports nothing as damaged by default");
        cache.refresh(&env, TeamId(0), 5, &[BuildingKind::Wall]);
        assert_eq!(cache.step, 5);
    }
}
