//! Fighter catalog (spec §4.7): stance-gated combat, naval behaviors, monk
//! support, patrol/scout movement, and target selection. The largest of the
//! three role catalogs.

use crate::action::{Action, Verb};
use crate::agent_state::MovementOrder;
use crate::domain::{AgentId, BuildingKind, Resource, Stance, ThingKind, UnitClass};
use crate::env::Environment;
use crate::geometry::{Direction, Position, SpiralSearch};
use crate::options::OptionDef;
use crate::roles::shared::{approach_then, nearest, step_towards, CraftBread, EmergencyHeal, FallbackSearch, SmeltGold, StoreValuables};
use crate::roles::{
    RoleCtx, ALLY_THREAT_RADIUS, DEFENSIVE_RETALIATION_WINDOW, HEALER_SEEK_RADIUS, KITE_TRIGGER_DISTANCE,
    PATROL_ARRIVAL_THRESHOLD, SCOUT_EXPLORE_GROWTH, SCOUT_FLEE_RADIUS, TARGET_SWAP_INTERVAL,
};

pub const RETREAT_HP_THRESHOLD: f32 = 0.33;
pub const TARGET_SEARCH_RADIUS: u32 = 20;
pub const RANGED_ATTACK_RANGE: u32 = 3;
pub const MELEE_ATTACK_RANGE: u32 = 1;
pub const ANTI_SIEGE_RADIUS: u32 = 8;
pub const HUNT_RADIUS: u32 = 10;
pub const ESCORT_RESPONSE_RADIUS: u32 = 15;
pub const LANTERN_SCAN_RADIUS: u32 = 10;
pub const SCOUT_EXPLORE_BASE_RADIUS: u32 = 10;
pub const SCOUT_EXPLORE_EARLY_EXIT_SCORE: f32 = 140.0;
pub const SCOUT_EXPLORE_MAX_RADIUS: u32 = 60;

const RANGED_CLASSES: [UnitClass; 1] = [UnitClass::RangedInfantry];
const SIEGE_CLASSES: [UnitClass; 2] = [UnitClass::Siege, UnitClass::Mangonel];
const SCOUT_CLASSES: [UnitClass; 3] = [UnitClass::Scout, UnitClass::LightCavalry, UnitClass::Hussar];
const NAVAL_CLASSES: [UnitClass; 5] =
    [UnitClass::FishingShip, UnitClass::Galley, UnitClass::FireShip, UnitClass::CannonGalleon, UnitClass::TransportShip];

fn attack_range(class: UnitClass) -> u32 {
    if RANGED_CLASSES.contains(&class) {
        RANGED_ATTACK_RANGE
    } else {
        MELEE_ATTACK_RANGE
    }
}

fn is_siege_class(class: UnitClass) -> bool {
    SIEGE_CLASSES.contains(&class)
}

/// Approximated rock-paper-scissors matchup bonus for the target-scoring
/// formula's `counter_damage` term (spec §4.7 "Target selection (advanced)").
fn counters(own: UnitClass, enemy: UnitClass) -> bool {
    use UnitClass::*;
    matches!(
        (own, enemy),
        (MeleeInfantry, LightCavalry) | (MeleeInfantry, Hussar) | (LightCavalry, RangedInfantry) | (Hussar, RangedInfantry)
            | (LightCavalry, Siege) | (Hussar, Siege) | (LightCavalry, Mangonel) | (Hussar, Mangonel)
            | (RangedInfantry, MeleeInfantry) | (RangedInfantry, BatteringRam)
    )
}

fn hp_ratio_bonus(ratio: f32) -> f32 {
    if ratio <= 0.25 {
        15.0
    } else if ratio <= 0.5 {
        10.0
    } else if ratio <= 0.75 {
        5.0
    } else {
        0.0
    }
}

fn threatens_ally<E: Environment>(ctx: &RoleCtx<'_, E>, enemy_pos: Position) -> bool {
    let mask = ctx.env.team_mask(ctx.team);
    ctx.env.nearby_agents(mask, enemy_pos, ALLY_THREAT_RADIUS).into_iter().any(|a| a != ctx.agent)
}

fn score_enemy<E: Environment>(ctx: &RoleCtx<'_, E>, pos: Position, enemy: AgentId) -> f32 {
    let Some(enemy_pos) = ctx.env.position(enemy) else {
        return f32::MIN;
    };
    let dist = pos.chebyshev_distance(enemy_pos);
    let own_class = ctx.env.unit_class(ctx.agent);
    let enemy_class = ctx.env.unit_class(enemy);
    let dist_term = 20.0 - (dist.min(20) as f32);
    let hp_term = hp_ratio_bonus(ctx.env.hp_ratio(enemy));
    let threat_term = if threatens_ally(ctx, enemy_pos) { 20.0 } else { 0.0 };
    let counter_term = if counters(own_class, enemy_class) { 6.0 } else { 0.0 };
    let siege_term = if is_siege_class(enemy_class) { 15.0 } else { 0.0 };
    let max_hp_term = 0.67 * ctx.env.max_hp(enemy).min(15.0);
    dist_term + hp_term + threat_term + counter_term + siege_term + max_hp_term
}

/// Pick (and cache) the best-scoring visible enemy, per spec §4.7's
/// `TargetSwapInterval` re-evaluation rule. `advanced` selects the scoring
/// formula over nearest-enemy when difficulty enables it.
fn select_target<E: Environment>(ctx: &mut RoleCtx<'_, E>, advanced: bool) -> Option<AgentId> {
    let pos = ctx.position();
    if let Some(cached) = ctx.state.target_eval_enemy {
        let still_valid = ctx.env.is_alive(cached)
            && !ctx.env.same_team(ctx.agent, cached)
            && ctx.env.position(cached).is_some_and(|p| pos.chebyshev_distance(p) <= TARGET_SEARCH_RADIUS);
        let due = ctx.step.saturating_sub(ctx.state.target_eval_step) >= TARGET_SWAP_INTERVAL;
        if still_valid && !due {
            return Some(cached);
        }
    }
    let candidates = ctx.env.enemies_in_radius(ctx.team, pos, TARGET_SEARCH_RADIUS);
    let best = if advanced {
        candidates.into_iter().max_by(|a, b| score_enemy(ctx, pos, *a).partial_cmp(&score_enemy(ctx, pos, *b)).unwrap())
    } else {
        ctx.env.nearest_enemy(ctx.team, pos, TARGET_SEARCH_RADIUS)
    };
    ctx.state.target_eval_enemy = best;
    ctx.state.target_eval_step = ctx.step;
    best
}

fn stance_allows_engage(stance: Stance, last_attacked_step: u32, current_step: u32) -> bool {
    match stance {
        Stance::Aggressive => true,
        Stance::Defensive => current_step.saturating_sub(last_attacked_step) <= DEFENSIVE_RETALIATION_WINDOW,
        Stance::StandGround | Stance::NoAttack => false,
    }
}

/// Move toward an enemy until in range for the acting agent's class, then
/// attack; shared by every stance-gated combat option.
fn engage<E: Environment>(ctx: &mut RoleCtx<'_, E>, enemy: AgentId) -> Action {
    let Some(enemy_pos) = ctx.env.position(enemy) else {
        return Action::NOOP;
    };
    let pos = ctx.position();
    let range = attack_range(ctx.env.unit_class(ctx.agent));
    if pos.chebyshev_distance(enemy_pos) <= range {
        Action::new(Verb::Attack, 0)
    } else {
        step_towards(ctx, enemy_pos)
    }
}

/// Battering-ram advance on the nearest enemy altar (unit-class-gated,
/// non-interruptible; spec §4.7 priority head).
pub struct BatteringRamAdvance;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for BatteringRamAdvance {
    fn name(&self) -> &'static str {
        "BatteringRamAdvance"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.unit_class(ctx.agent) == UnitClass::BatteringRam && !ctx.env.enemy_altars(ctx.team).is_empty()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let altars = ctx.env.enemy_altars(ctx.team);
        match nearest(ctx.position(), &altars) {
            Some(&altar) => approach_then(ctx, altar, Action::new(Verb::Attack, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        false
    }
}

/// DemoShip kamikaze: advance on the nearest enemy, detonate on contact
/// (spec §4.7: "DemoShip kamikaze non-interruptible").
pub struct DemoShipKamikaze;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for DemoShipKamikaze {
    fn name(&self) -> &'static str {
        "DemoShipKamikaze"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.unit_class(ctx.agent) == UnitClass::DemoShip && ctx.env.nearest_enemy(ctx.team, ctx.position(), TARGET_SEARCH_RADIUS).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let Some(enemy) = ctx.env.nearest_enemy(ctx.team, ctx.position(), TARGET_SEARCH_RADIUS) else {
            return Action::NOOP;
        };
        engage(ctx, enemy)
    }
    fn interruptible(&self) -> bool {
        false
    }
}

/// The remaining naval support classes: move toward and harass the nearest
/// enemy within their patrol radius (spec §4.7 lists each by name; absent
/// more specific water-combat data these share one interruptible behavior).
pub struct NavalSupport;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for NavalSupport {
    fn name(&self) -> &'static str {
        "NavalSupport"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        NAVAL_CLASSES.contains(&ctx.env.unit_class(ctx.agent)) && ctx.env.is_water(ctx.position())
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match ctx.env.nearest_enemy(ctx.team, ctx.position(), TARGET_SEARCH_RADIUS) {
            Some(enemy) => engage(ctx, enemy),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Fight through when every one of the 8 neighboring tiles is blocked
/// (spec §4.7 "Breakout when enclosed").
pub struct Breakout;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Breakout {
    fn name(&self) -> &'static str {
        "Breakout"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let pos = ctx.position();
        Direction::ALL.into_iter().all(|d| {
            let step = pos.step(d);
            !ctx.env.is_valid_pos(step) || !ctx.env.is_empty(step)
        })
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let blocker = Direction::ALL.into_iter().find(|d| ctx.env.is_valid_pos(pos.step(*d)) && !ctx.env.is_empty(pos.step(*d)));
        match blocker {
            Some(dir) => Action::new(Verb::Attack, dir.index()),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// HP ≤ 33%: retreat to the home altar (spec §4.7 priority head).
pub struct Retreat;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Retreat {
    fn name(&self) -> &'static str {
        "Retreat"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.hp_ratio(ctx.agent) <= RETREAT_HP_THRESHOLD
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match ctx.env.home_altar(ctx.agent) {
            Some(altar) => step_towards(ctx, altar),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Scout classes flee and report the sighting to the threat map
/// (spec §4.7 "ScoutFlee ... reports to threat map").
pub struct ScoutFlee;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for ScoutFlee {
    fn name(&self) -> &'static str {
        "ScoutFlee"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        SCOUT_CLASSES.contains(&ctx.env.unit_class(ctx.agent))
            && ctx.env.nearest_enemy(ctx.team, ctx.position(), SCOUT_FLEE_RADIUS).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let Some(enemy) = ctx.env.nearest_enemy(ctx.team, pos, SCOUT_FLEE_RADIUS) else {
            return Action::NOOP;
        };
        if let Some(enemy_pos) = ctx.env.position(enemy) {
            ctx.coordination.threat_map.report_threat(enemy_pos, 1.0, ctx.step, enemy, false);
        }
        match ctx.env.home_altar(ctx.agent) {
            Some(altar) => step_towards(ctx, altar),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        false
    }
}

/// HP ≤ 33%, no food carried (no self-heal available), and a monk ally is
/// within `HealerSeekRadius` (spec §4.7 priority head).
pub struct SeekHealer;

impl<E: Environment> SeekHealer {
    fn nearest_monk<E2: Environment>(ctx: &RoleCtx<'_, E2>) -> Option<AgentId> {
        let mask = ctx.env.team_mask(ctx.team);
        ctx.env
            .nearby_agents(mask, ctx.position(), HEALER_SEEK_RADIUS)
            .into_iter()
            .filter(|a| ctx.env.unit_class(*a) == UnitClass::Monk)
            .min_by_key(|a| ctx.env.position(*a).map(|p| ctx.position().chebyshev_distance(p)).unwrap_or(u32::MAX))
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for SeekHealer {
    fn name(&self) -> &'static str {
        "SeekHealer"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.hp_ratio(ctx.agent) <= RETREAT_HP_THRESHOLD
            && !matches!(ctx.env.carrying(ctx.agent), Some((Resource::Food, n)) if n > 0)
            && Self::nearest_monk(ctx).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::nearest_monk(ctx).and_then(|m| ctx.env.position(m)) {
            Some(monk_pos) => approach_then(ctx, monk_pos, Action::NOOP),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Monk: collect relics, deposit at the home monastery, else search
/// (spec §4.7 "Monk behavior").
pub struct Monk;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Monk {
    fn name(&self) -> &'static str {
        "Monk"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.unit_class(ctx.agent) == UnitClass::Monk
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if ctx.state.holding_relic {
            let monasteries = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Monastery);
            return match nearest(ctx.position(), &monasteries) {
                Some(&monastery) if ctx.position().chebyshev_distance(monastery) <= 1 => {
                    ctx.state.holding_relic = false;
                    Action::new(Verb::Put, 2)
                }
                Some(&monastery) => step_towards(ctx, monastery),
                None => Action::NOOP,
            };
        }
        let relics = ctx.env.things_of_kind(ThingKind::Relic);
        match nearest(ctx.position(), &relics) {
            Some(&relic) if ctx.position().chebyshev_distance(relic) <= 1 => {
                ctx.state.holding_relic = true;
                Action::new(Verb::Use, 6)
            }
            Some(&relic) => step_towards(ctx, relic),
            None => FallbackSearch.act(ctx),
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Waypoint-following patrol (spec §4.7 "Patrol"). `HoldPosition`/`Follow`/
/// `Guard`/`Stop` reuse the same `MovementOrder` scratch with different
/// intents, represented here as one option keyed off `movement_order.stopped`/
/// `holding`/`follow_target`. `stopped` is a hard stop that pre-empts even
/// stance-gated auto-engage; `holding` stands ground but still engages per
/// the stance gates, covering both `HoldPosition` and `Guard`.
pub struct PatrolFollowGuard;

impl PatrolFollowGuard {
    fn order(ctx: &mut RoleCtx<'_, impl Environment>) -> &mut MovementOrder {
        &mut ctx.state.movement_order
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for PatrolFollowGuard {
    fn name(&self) -> &'static str {
        "PatrolFollowGuard"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let order = &ctx.state.movement_order;
        order.stopped || order.holding || !order.waypoints.is_empty() || order.follow_target.is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        if ctx.state.movement_order.stopped {
            return Action::NOOP;
        }
        let stance = ctx.env.stance(ctx.agent);
        let pos = ctx.position();
        if stance_allows_engage(stance, ctx.env.last_attacked_step(ctx.agent), ctx.step) {
            if let Some(enemy) = ctx.env.nearest_enemy(ctx.team, pos, TARGET_SEARCH_RADIUS) {
                return engage(ctx, enemy);
            }
        }
        if let Some(follow_target) = ctx.state.movement_order.follow_target {
            return match ctx.env.position(follow_target) {
                Some(target_pos) => step_towards(ctx, target_pos),
                None => Action::NOOP,
            };
        }
        if ctx.state.movement_order.holding {
            return Action::NOOP;
        }
        let order = Self::order(ctx);
        if order.waypoints.is_empty() {
            return Action::NOOP;
        }
        let waypoint = order.waypoints[order.waypoint_index];
        if pos.chebyshev_distance(waypoint) <= PATROL_ARRIVAL_THRESHOLD {
            let order = Self::order(ctx);
            order.waypoint_index = (order.waypoint_index + 1) % order.waypoints.len();
        }
        step_towards(ctx, waypoint)
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Villager builds a wall tile between the home altar and the nearest
/// threat (spec §4.7 "DividerDefense").
pub struct DividerDefense;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for DividerDefense {
    fn name(&self) -> &'static str {
        "DividerDefense"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.unit_class(ctx.agent) == UnitClass::Villager
            && ctx.env.home_altar(ctx.agent).is_some()
            && ctx.env.nearest_enemy(ctx.team, ctx.position(), ANTI_SIEGE_RADIUS).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let Some(altar) = ctx.env.home_altar(ctx.agent) else {
            return Action::NOOP;
        };
        let Some(enemy) = ctx.env.nearest_enemy(ctx.team, ctx.position(), ANTI_SIEGE_RADIUS) else {
            return Action::NOOP;
        };
        let Some(enemy_pos) = ctx.env.position(enemy) else {
            return Action::NOOP;
        };
        let midpoint = Position::new((altar.x + enemy_pos.x) / 2, (altar.y + enemy_pos.y) / 2);
        if ctx.env.go_to_adjacent_and_build(ctx.agent, midpoint, BuildingKind::Wall) {
            Action::new(Verb::Build, BuildingKind::Wall as u8)
        } else {
            step_towards(ctx, midpoint)
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Place lanterns around team structures keeping spacing ≥3
/// (spec §4.7 "Lanterns").
pub struct Lanterns;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Lanterns {
    fn name(&self) -> &'static str {
        "Lanterns"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let structures = ctx.env.buildings_of_kind(ctx.team, BuildingKind::TownCenter);
        !structures.is_empty()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let structures = ctx.env.buildings_of_kind(ctx.team, BuildingKind::TownCenter);
        let Some(&center) = nearest(ctx.position(), &structures) else {
            return Action::NOOP;
        };
        let lanterns = ctx.env.things_of_kind(ThingKind::Lantern);
        let candidate = SpiralSearch::new(center, LANTERN_SCAN_RADIUS).find(|p| {
            ctx.env.is_valid_pos(*p)
                && ctx.env.is_buildable_terrain(*p)
                && !ctx.env.is_water(*p)
                && lanterns.iter().all(|l| l.chebyshev_distance(*p) >= crate::roles::LANTERN_MIN_SPACING)
        });
        match candidate {
            Some(spot) => approach_then(ctx, spot, Action::new(Verb::PlantLantern, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Carry food home to the nearest Granary/TownCenter (spec §4.7 "DropoffFood").
pub struct DropoffFood;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for DropoffFood {
    fn name(&self) -> &'static str {
        "DropoffFood"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        matches!(ctx.env.carrying(ctx.agent), Some((Resource::Food, n)) if n > 0)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let dropoffs: Vec<Position> = ctx
            .env
            .buildings_of_kind(ctx.team, BuildingKind::Granary)
            .into_iter()
            .chain(ctx.env.buildings_of_kind(ctx.team, BuildingKind::TownCenter))
            .collect();
        match nearest(ctx.position(), &dropoffs) {
            Some(&dropoff) => approach_then(ctx, dropoff, Action::new(Verb::Put, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Villager queues units at the first affordable training building
/// (spec §4.7 "Train").
pub struct Train;

const TRAINING_BUILDINGS: [BuildingKind; 3] = [BuildingKind::Barracks, BuildingKind::ArcheryRange, BuildingKind::Stable];

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Train {
    fn name(&self) -> &'static str {
        "Train"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.unit_class(ctx.agent) == UnitClass::Villager
            && TRAINING_BUILDINGS.iter().any(|k| ctx.env.building_count(ctx.team, *k) > 0)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        for kind in TRAINING_BUILDINGS {
            if ctx.env.building_count(ctx.team, kind) > 0 && ctx.env.try_batch_queue_train(kind, ctx.team, 1) {
                return Action::new(Verb::Use, 7);
            }
        }
        Action::NOOP
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Melee-line units convert to siege at a `SiegeWorkshop` once an enemy
/// structure has been sighted (spec §4.7 "BecomeSiege").
pub struct BecomeSiege;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for BecomeSiege {
    fn name(&self) -> &'static str {
        "BecomeSiege"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        matches!(ctx.env.unit_class(ctx.agent), UnitClass::MeleeInfantry)
            && ctx.coordination.threat_map.nearest_structure(ctx.position()).is_some()
            && !ctx.env.buildings_of_kind(ctx.team, BuildingKind::SiegeWorkshop).is_empty()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let workshops = ctx.env.buildings_of_kind(ctx.team, BuildingKind::SiegeWorkshop);
        match nearest(ctx.position(), &workshops) {
            Some(&workshop) => approach_then(ctx, workshop, Action::new(Verb::Swap, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Armor below max or infantry missing a spear upgrade: visit the
/// Blacksmith (spec §4.7 "MaintainGear").
pub struct MaintainGear;

impl<E: Environment> MaintainGear {
    fn blacksmith<E2: Environment>(ctx: &RoleCtx<'_, E2>) -> Option<Position> {
        let forges = ctx.env.buildings_of_kind(ctx.team, BuildingKind::Blacksmith);
        nearest(ctx.position(), &forges).copied()
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for MaintainGear {
    fn name(&self) -> &'static str {
        "MaintainGear"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.hp_ratio(ctx.agent) < 1.0 && Self::blacksmith(ctx).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        match Self::blacksmith(ctx) {
            Some(forge) => approach_then(ctx, forge, Action::new(Verb::Use, 8)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Ranged kiting: strafe away from an adjacent melee threat while keeping
/// it in range (spec §4.7 "Kiting").
pub struct Kite;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Kite {
    fn name(&self) -> &'static str {
        "Kite"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        if !RANGED_CLASSES.contains(&ctx.env.unit_class(ctx.agent)) {
            return false;
        }
        let stance = ctx.env.stance(ctx.agent);
        if !stance_allows_engage(stance, ctx.env.last_attacked_step(ctx.agent), ctx.step) {
            return false;
        }
        let pos = ctx.position();
        ctx.env
            .enemies_in_radius(ctx.team, pos, KITE_TRIGGER_DISTANCE)
            .into_iter()
            .any(|e| !is_siege_class(ctx.env.unit_class(e)) && attack_range(ctx.env.unit_class(e)) <= MELEE_ATTACK_RANGE)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let Some(threat) = ctx
            .env
            .enemies_in_radius(ctx.team, pos, KITE_TRIGGER_DISTANCE)
            .into_iter()
            .filter_map(|e| ctx.env.position(e))
            .min_by_key(|p| pos.chebyshev_distance(*p))
        else {
            return Action::NOOP;
        };
        let Some(away) = Direction::towards(threat, pos) else {
            return Action::NOOP;
        };
        let candidates = [away, away.perpendiculars().0, away.perpendiculars().1];
        let current_dist = pos.chebyshev_distance(threat);
        let best = candidates.into_iter().find(|d| {
            let stepped = pos.step(*d);
            ctx.env.is_valid_pos(stepped) && ctx.env.is_empty(stepped) && stepped.chebyshev_distance(threat) >= current_dist
        });
        match best {
            Some(dir) => Action::new(Verb::Move, dir.index()),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Prioritize attacking enemy siege units within range (spec §4.7 "AntiSiege").
pub struct AntiSiege;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for AntiSiege {
    fn name(&self) -> &'static str {
        "AntiSiege"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.env.enemies_in_radius(ctx.team, ctx.position(), ANTI_SIEGE_RADIUS).into_iter().any(|e| is_siege_class(ctx.env.unit_class(e)))
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let siege_enemy = ctx
            .env
            .enemies_in_radius(ctx.team, pos, ANTI_SIEGE_RADIUS)
            .into_iter()
            .filter(|e| is_siege_class(ctx.env.unit_class(*e)))
            .min_by_key(|e| ctx.env.position(*e).map(|p| pos.chebyshev_distance(p)).unwrap_or(u32::MAX));
        match siege_enemy {
            Some(enemy) => engage(ctx, enemy),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Respond to outstanding protection requests (spec §4.7 "Escort").
pub struct Escort;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Escort {
    fn name(&self) -> &'static str {
        "Escort"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.coordination.requests.has_unfulfilled(crate::domain::RequestKind::Protection)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let target = ctx.coordination.requests.find_nearest_protection(ctx.position()).map(|r| r.threat_position);
        let Some(target) = target else {
            return Action::NOOP;
        };
        if ctx.position().chebyshev_distance(target) <= ESCORT_RESPONSE_RADIUS {
            if let Some(enemy) = ctx.env.nearest_enemy(ctx.team, target, ESCORT_RESPONSE_RADIUS) {
                let action = engage(ctx, enemy);
                if action != Action::NOOP {
                    ctx.coordination.requests.mark_fulfilled(crate::domain::RequestKind::Protection);
                }
                return action;
            }
        }
        step_towards(ctx, target)
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Attack nearby Tumor/Spawner predators (spec §4.7 "HuntPredators").
pub struct HuntPredators;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for HuntPredators {
    fn name(&self) -> &'static str {
        "HuntPredators"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let pos = ctx.position();
        ctx.env.things_of_kind(ThingKind::Tumor).into_iter().chain(ctx.env.things_of_kind(ThingKind::Spawner)).any(|p| pos.chebyshev_distance(p) <= HUNT_RADIUS)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let predator = ctx
            .env
            .things_of_kind(ThingKind::Tumor)
            .into_iter()
            .chain(ctx.env.things_of_kind(ThingKind::Spawner))
            .min_by_key(|p| pos.chebyshev_distance(*p));
        match predator {
            Some(target) => approach_then(ctx, target, Action::new(Verb::Attack, 0)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Attack nearby Goblins (spec §4.7 "ClearGoblins").
pub struct ClearGoblins;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for ClearGoblins {
    fn name(&self) -> &'static str {
        "ClearGoblins"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !ctx.env.things_of_kind(ThingKind::Goblin).is_empty()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let goblins = ctx.env.things_of_kind(ThingKind::Goblin);
        match nearest(ctx.position(), &goblins) {
            Some(&goblin) => approach_then(ctx, goblin, Action::new(Verb::Attack, 1)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Stance-gated opportunistic combat: hunt Tumor/Spawner when no better
/// target, else ensure-hunt-food (spec §4.7 "Aggressive").
pub struct Aggressive;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Aggressive {
    fn name(&self) -> &'static str {
        "Aggressive"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let stance = ctx.env.stance(ctx.agent);
        stance_allows_engage(stance, ctx.env.last_attacked_step(ctx.agent), ctx.step)
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let predator = ctx
            .env
            .things_of_kind(ThingKind::Tumor)
            .into_iter()
            .chain(ctx.env.things_of_kind(ThingKind::Spawner))
            .min_by_key(|p| pos.chebyshev_distance(*p));
        if let Some(target) = predator {
            return approach_then(ctx, target, Action::new(Verb::Attack, 0));
        }
        let cows = ctx.env.things_of_kind(ThingKind::Cow);
        match nearest(pos, &cows) {
            Some(&cow) => approach_then(ctx, cow, Action::new(Verb::Attack, 2)),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Move to and attack the currently selected enemy (spec §4.7 "AttackMove").
pub struct AttackMove;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for AttackMove {
    fn name(&self) -> &'static str {
        "AttackMove"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        let stance = ctx.env.stance(ctx.agent);
        stance_allows_engage(stance, ctx.env.last_attacked_step(ctx.agent), ctx.step)
            && ctx.env.nearest_enemy(ctx.team, ctx.position(), TARGET_SEARCH_RADIUS).is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let advanced = ctx.difficulty.advanced_targeting;
        match select_target(ctx, advanced) {
            Some(enemy) => engage(ctx, enemy),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Hold a formation slot while engaging targets of opportunity
/// (spec §4.7 "Formation").
pub struct Formation;

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for Formation {
    fn name(&self) -> &'static str {
        "Formation"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        ctx.state.movement_order.rally_point.is_some()
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let stance = ctx.env.stance(ctx.agent);
        if stance_allows_engage(stance, ctx.env.last_attacked_step(ctx.agent), ctx.step) {
            if let Some(enemy) = ctx.env.nearest_enemy(ctx.team, ctx.position(), TARGET_SEARCH_RADIUS) {
                return engage(ctx, enemy);
            }
        }
        match ctx.state.movement_order.rally_point {
            Some(slot) => step_towards(ctx, slot),
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Scout classes explore toward unrevealed territory, biased by a scoring
/// function and growing the search radius past the current frontier
/// (spec §4.7 "Scout").
pub struct ScoutExplore;

impl ScoutExplore {
    fn score<E: Environment>(ctx: &RoleCtx<'_, E>, candidate: Position, radius: u32, explore_radius: u32) -> f32 {
        let pos = ctx.position();
        let dist = pos.chebyshev_distance(candidate) as f32;
        let threat_strength = ctx.coordination.threat_map.get_total_threat_strength(candidate, radius, ctx.step);
        let unrevealed = !ctx.env.is_revealed(ctx.team, candidate);
        let nearby_unrevealed = SpiralSearch::new(candidate, 2).filter(|p| !ctx.env.is_revealed(ctx.team, *p)).count();
        100.0 - (dist - explore_radius as f32).abs() * 2.0 - threat_strength * 20.0
            + if unrevealed { 50.0 } else { 0.0 }
            + 10.0 * nearby_unrevealed.min(5) as f32
    }
}

impl<E: Environment> OptionDef<RoleCtx<'_, E>> for ScoutExplore {
    fn name(&self) -> &'static str {
        "ScoutExplore"
    }
    fn can_start(&self, ctx: &RoleCtx<'_, E>) -> bool {
        SCOUT_CLASSES.contains(&ctx.env.unit_class(ctx.agent))
    }
    fn should_terminate(&self, ctx: &RoleCtx<'_, E>) -> bool {
        !self.can_start(ctx)
    }
    fn act(&self, ctx: &mut RoleCtx<'_, E>) -> Action {
        let pos = ctx.position();
        let mut explore_radius = SCOUT_EXPLORE_BASE_RADIUS + ctx.state.spiral_cursor;
        if explore_radius > SCOUT_EXPLORE_MAX_RADIUS {
            explore_radius = SCOUT_EXPLORE_MAX_RADIUS;
        }
        let mut best: Option<(Position, f32)> = None;
        for candidate in SpiralSearch::new(pos, explore_radius) {
            if !ctx.env.is_valid_pos(candidate) || !ctx.env.is_empty(candidate) {
                continue;
            }
            let score = Self::score(ctx, candidate, ALLY_THREAT_RADIUS, explore_radius);
            if score >= SCOUT_EXPLORE_EARLY_EXIT_SCORE {
                best = Some((candidate, score));
                break;
            }
            if !best.is_some_and(|(_, b)| b >= score) {
                best = Some((candidate, score));
            }
        }
        match best {
            Some((target, _)) => {
                if pos.chebyshev_distance(target) <= PATROL_ARRIVAL_THRESHOLD {
                    ctx.state.spiral_cursor = (ctx.state.spiral_cursor + SCOUT_EXPLORE_GROWTH).min(SCOUT_EXPLORE_MAX_RADIUS - SCOUT_EXPLORE_BASE_RADIUS);
                }
                step_towards(ctx, target)
            }
            None => Action::NOOP,
        }
    }
    fn interruptible(&self) -> bool {
        true
    }
}

/// Build the full, priority-ordered fighter catalog (spec §4.7).
pub fn catalog<'a, E: Environment + 'a>() -> Vec<Box<dyn OptionDef<RoleCtx<'a, E>> + 'a>> {
    vec![
        Box::new(BatteringRamAdvance),
        Box::new(DemoShipKamikaze),
        Box::new(NavalSupport),
        Box::new(Breakout),
        Box::new(Retreat),
        Box::new(ScoutFlee),
        Box::new(EmergencyHeal),
        Box::new(SeekHealer),
        Box::new(Monk),
        Box::new(PatrolFollowGuard),
        Box::new(DividerDefense),
        Box::new(Lanterns),
        Box::new(DropoffFood),
        Box::new(Train),
        Box::new(BecomeSiege),
        Box::new(MaintainGear),
        Box::new(Kite),
        Box::new(AntiSiege),
        Box::new(Escort),
        Box::new(HuntPredators),
        Box::new(ClearGoblins),
        Box::new(SmeltGold),
        Box::new(CraftBread),
        Box::new(StoreValuables),
        Box::new(Aggressive),
        Box::new(AttackMove),
        Box::new(Formation),
        Box::new(ScoutExplore),
        Box::new(FallbackSearch),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::TeamCoordination;
    use crate::difficulty::DifficultyConfig;
    use crate::domain::TeamId;
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
        damaged_buildings: &'a crate::roles::builder::DamagedBuildingCache,
        agent: AgentId,
    ) -> RoleCtx<'a, FakeEnv> {
        RoleCtx { env, agent, team: TeamId(0), state, coordination, difficulty, rng, step: 0, pathfinding, damaged_buildings }
    }

    #[test]
    fn catalog_places_battering_ram_first_and_fallback_last() {
        let catalog = catalog::<FakeEnv>();
        assert_eq!(catalog[0].name(), "BatteringRamAdvance");
        assert_eq!(catalog.last().unwrap().name(), "FallbackSearch");
    }

    #[test]
    fn retreat_fires_at_or_below_one_third_health() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(0, 0));
        env.hp_ratio.insert(agent, 0.3);
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let c = make_ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(Retreat.can_start(&c));
    }

    #[test]
    fn retreat_does_not_fire_above_threshold() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(0, 0));
        env.hp_ratio.insert(agent, 0.5);
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let c = make_ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(!Retreat.can_start(&c));
    }

    #[test]
    fn stance_gates_match_spec_table() {
        assert!(stance_allows_engage(Stance::Aggressive, 0, 1000));
        assert!(stance_allows_engage(Stance::Defensive, 100, 120));
        assert!(!stance_allows_engage(Stance::Defensive, 0, 100));
        assert!(!stance_allows_engage(Stance::StandGround, 0, 0));
        assert!(!stance_allows_engage(Stance::NoAttack, 0, 0));
    }

    #[test]
    fn counters_table_is_symmetric_rock_paper_scissors() {
        assert!(counters(UnitClass::MeleeInfantry, UnitClass::LightCavalry));
        assert!(counters(UnitClass::LightCavalry, UnitClass::RangedInfantry));
        assert!(counters(UnitClass::RangedInfantry, UnitClass::MeleeInfantry));
        assert!(!counters(UnitClass::MeleeInfantry, UnitClass::MeleeInfantry));
    }

    #[test]
    fn breakout_requires_every_neighbor_blocked() {
        let mut env = FakeEnv::new();
        let agent = AgentId(1);
        env.place(agent, TeamId(0), Position::new(5, 5));
        for d in Direction::ALL {
            env.blocked.push(Position::new(5, 5).step(d));
        }
        let mut state = crate::agent_state::AgentState::default();
        let mut coordination = TeamCoordination::new();
        let difficulty = DifficultyConfig::default();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        let mut pathfinding = PathfindingCache::new(64, 64);
        let damaged_buildings = crate::roles::builder::DamagedBuildingCache::default();
        let c = make_ctx(&mut env, &mut state, &mut coordination, &difficulty, &mut rng, &mut pathfinding, &damaged_buildings, agent);
        assert!(Breakout.can_start(&c));
    }
}
