//! The settlement / town-split subsystem (spec §4.8). Unlike the three role
//! catalogs this is not an `OptionDef` -- it is a per-team state machine the
//! controller drives directly once per check interval, independent of any
//! single agent's turn.
//!
//! The diagram's four states collapse into two calls: `check_and_trigger`
//! covers `Stable -> CheckCondition -> SelectSettlers -> MarkAndSetTarget`,
//! and `check_settler_arrivals` covers `Stable -> CheckArrivals -> FoundTown`.
//! Both are idempotent no-ops when their gating condition isn't met, so the
//! controller can call them unconditionally every `TownSplitCheckInterval`
//! steps.

use std::collections::HashMap;

use crate::domain::{AgentId, Resource, TeamId, ThingKind};
use crate::env::Environment;
use crate::geometry::{Position, SpiralSearch};

pub const TOWN_SPLIT_CHECK_INTERVAL: u32 = 100;
pub const TOWN_SPLIT_POP_THRESHOLD: u32 = 8;
pub const TOWN_SPLIT_WOOD_COST: u32 = 14;
pub const TOWN_SPLIT_COOLDOWN_STEPS: u32 = 200;
pub const TOWN_SPLIT_SETTLER_COUNT: u32 = 6;
pub const SETTLER_FOUNDING_QUORUM: u32 = 5;
pub const TOWN_SPLIT_MIN_DISTANCE: u32 = 20;
pub const TOWN_SPLIT_MAX_DISTANCE: u32 = 40;
pub const SITE_SCORE_RESOURCE_RADIUS: u32 = 8;

/// Per-team scratch the controller holds alongside `TeamCoordination`
/// (spec §4.8: `townSplitLastStep`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementState {
    last_split_step: u32,
}

impl SettlementState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct Settlement;

impl Settlement {
    /// Drive both halves of the state machine for one team. `team_agents`
    /// is the controller's full agent roster for `team` -- settler arrivals
    /// must be checked across every settler regardless of where it currently
    /// stands, not just agents near a candidate site.
    pub fn tick<E: Environment>(env: &mut E, team: TeamId, team_agents: &[AgentId], step: u32, state: &mut SettlementState) {
        if step % TOWN_SPLIT_CHECK_INTERVAL != 0 {
            return;
        }
        Self::check_settler_arrivals(env, team, team_agents);
        Self::check_and_trigger(env, team, step, state);
    }

    /// `Stable -> CheckCondition -> SelectSettlers -> MarkAndSetTarget`.
    /// Returns `true` if a settler group was marked this call.
    pub fn check_and_trigger<E: Environment>(env: &mut E, team: TeamId, step: u32, state: &mut SettlementState) -> bool {
        if step.saturating_sub(state.last_split_step) < TOWN_SPLIT_COOLDOWN_STEPS {
            return false;
        }
        for altar in env.friendly_altars(team) {
            let villagers = env.villagers_at_altar(team, altar);
            if (villagers.len() as u32) < TOWN_SPLIT_POP_THRESHOLD {
                continue;
            }
            if !env.can_spend_stockpile(team, &[(Resource::Wood, TOWN_SPLIT_WOOD_COST)]) {
                continue;
            }
            let Some(site) = Self::score_site_candidates(env, team, altar) else {
                continue;
            };
            let settlers = Self::select_settlers(env, altar, &villagers);
            if settlers.is_empty() {
                continue;
            }
            for &agent in &settlers {
                env.mark_settler(agent, site);
            }
            state.last_split_step = step;
            return true;
        }
        false
    }

    /// `Stable -> CheckArrivals -> FoundTown`. Returns the founded site, if any.
    pub fn check_settler_arrivals<E: Environment>(env: &mut E, team: TeamId, team_agents: &[AgentId]) -> Option<Position> {
        let mut by_site: HashMap<Position, Vec<AgentId>> = HashMap::new();
        for &agent in team_agents {
            if env.is_settler(agent) {
                if let Some(target) = env.settler_target(agent) {
                    by_site.entry(target).or_default().push(agent);
                }
            }
        }
        for (site, group) in by_site {
            let arrived = group.iter().filter(|&&a| env.settler_arrived(a)).count() as u32;
            if arrived >= SETTLER_FOUNDING_QUORUM && Self::found_town(env, team, site, &group) {
                return Some(site);
            }
        }
        None
    }

    /// Place the new altar and town center, reassign every settler targeting
    /// `site` (arrived or not), and rebalance altar populations. Aborts
    /// atomically -- no wood spent, no settler reassigned -- if the altar
    /// can't be placed (spec §7 "Settlement founding failure").
    fn found_town<E: Environment>(env: &mut E, team: TeamId, site: Position, settlers: &[AgentId]) -> bool {
        let Some(old_altar) = settlers.first().and_then(|&a| env.home_altar(a)) else {
            return false;
        };
        if !env.place_altar(team, site) {
            return false;
        }
        env.place_starting_town_center(team, site);
        env.place_starting_resource_buildings(team, site);
        for &agent in settlers {
            env.set_home_altar(agent, site);
            env.clear_settler(agent);
        }
        let group_size = settlers.len() as i32;
        env.adjust_altar_population(site, group_size);
        env.adjust_altar_population(old_altar, -group_size);
        true
    }

    /// Among non-settler villagers at `altar`, sort by `(isIdle DESC,
    /// distFromAltar ASC)` and take up to `TownSplitSettlerCount`.
    fn select_settlers<E: Environment>(env: &E, altar: Position, villagers: &[AgentId]) -> Vec<AgentId> {
        let mut candidates: Vec<AgentId> = villagers.iter().copied().filter(|a| !env.is_settler(*a)).collect();
        candidates.sort_by(|a, b| {
            env.is_idle(*b).cmp(&env.is_idle(*a)).then_with(|| {
                let da = env.position(*a).map(|p| p.chebyshev_distance(altar)).unwrap_or(u32::MAX);
                let db = env.position(*b).map(|p| p.chebyshev_distance(altar)).unwrap_or(u32::MAX);
                da.cmp(&db)
            })
        });
        candidates.truncate(TOWN_SPLIT_SETTLER_COUNT as usize);
        candidates
    }

    /// Spiral out from `parent_altar` within `[TownSplitMinDistance,
    /// TownSplitMaxDistance]`, keep sites passing `site_is_eligible`, and
    /// return the highest-scoring one (spec §4.8 "Site scoring").
    fn score_site_candidates<E: Environment>(env: &E, team: TeamId, parent_altar: Position) -> Option<Position> {
        let preferred = (TOWN_SPLIT_MIN_DISTANCE + TOWN_SPLIT_MAX_DISTANCE) as f32 / 2.0;
        let mut best: Option<(Position, f32)> = None;
        for candidate in SpiralSearch::new(parent_altar, TOWN_SPLIT_MAX_DISTANCE) {
            let dist = parent_altar.chebyshev_distance(candidate);
            if dist < TOWN_SPLIT_MIN_DISTANCE || dist > TOWN_SPLIT_MAX_DISTANCE {
                continue;
            }
            if !Self::site_is_eligible(env, team, candidate) {
                continue;
            }
            let score = Self::score_site(env, candidate, preferred, dist);
            if !best.is_some_and(|(_, b)| b >= score) {
                best = Some((candidate, score));
            }
        }
        best.map(|(pos, _)| pos)
    }

    fn site_is_eligible<E: Environment>(env: &E, team: TeamId, candidate: Position) -> bool {
        let border = (env.map_border() + 2) as i32;
        if candidate.x < border
            || candidate.y < border
            || candidate.x >= env.map_width() as i32 - border
            || candidate.y >= env.map_height() as i32 - border
        {
            return false;
        }
        for dx in -1..=1i32 {
            for dy in -1..=1i32 {
                let p = Position::new(candidate.x + dx, candidate.y + dy);
                if !env.is_valid_pos(p) || !env.is_buildable_terrain(p) || env.is_water(p) || !env.is_empty(p) {
                    return false;
                }
            }
        }
        if env.friendly_altars(team).iter().any(|a| a.chebyshev_distance(candidate) < TOWN_SPLIT_MIN_DISTANCE) {
            return false;
        }
        if env.enemy_altars(team).iter().any(|a| a.chebyshev_distance(candidate) < TOWN_SPLIT_MIN_DISTANCE / 2) {
            return false;
        }
        true
    }

    fn score_site<E: Environment>(env: &E, candidate: Position, preferred: f32, dist: u32) -> f32 {
        let wood = Self::count_nearby(env, candidate, &[ThingKind::Tree, ThingKind::Stump]);
        let stone = Self::count_nearby(env, candidate, &[ThingKind::Stone, ThingKind::Stalagmite]);
        let gold = Self::count_nearby(env, candidate, &[ThingKind::GoldVein]);
        2.0 * wood as f32 + 3.0 * stone as f32 + 4.0 * gold as f32 - 2.0 * (dist as f32 - preferred).abs()
    }

    fn count_nearby<E: Environment>(env: &E, center: Position, kinds: &[ThingKind]) -> u32 {
        kinds
            .iter()
            .flat_map(|k| env.things_of_kind(*k))
            .filter(|p| center.chebyshev_distance(*p) <= SITE_SCORE_RESOURCE_RADIUS)
            .count() as u32
    }
}
