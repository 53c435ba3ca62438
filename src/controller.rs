//! The controller (spec §3, §5 scheduling, §4.9 per-tick pipeline). Owns
//! every per-agent and per-team structure the rest of the crate defines and
//! drives one tick: mark lifecycle, prune the coordination bus, refresh
//! per-team caches, run the settlement subsystem, then dispatch each alive
//! agent to its role's option catalog in ascending agent-id order.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::action::Action;
use crate::agent_state::{AgentState, Role};
use crate::cache::AgentLifecycleTracker;
use crate::coordination::TeamCoordination;
use crate::difficulty::DifficultyConfig;
use crate::domain::{AgentId, BuildingKind, TeamId};
use crate::env::Environment;
use crate::options::run_options;
use crate::pathfinding::PathfindingCache;
use crate::roles::builder::DamagedBuildingCache;
use crate::roles::RoleCtx;
use crate::settlement::{Settlement, SettlementState};

/// Every building kind scanned for repair candidates by the builder
/// catalog's damaged-building options (spec §4.6 item 8: "iterate ... once
/// per step, recording up to 32 damaged positions per team").
const ALL_BUILDING_KINDS: [BuildingKind; 22] = [
    BuildingKind::Altar,
    BuildingKind::TownCenter,
    BuildingKind::Granary,
    BuildingKind::LumberCamp,
    BuildingKind::Quarry,
    BuildingKind::MiningCamp,
    BuildingKind::Mill,
    BuildingKind::House,
    BuildingKind::WeavingLoom,
    BuildingKind::ClayOven,
    BuildingKind::Blacksmith,
    BuildingKind::Barracks,
    BuildingKind::ArcheryRange,
    BuildingKind::Stable,
    BuildingKind::SiegeWorkshop,
    BuildingKind::MangonelWorkshop,
    BuildingKind::Outpost,
    BuildingKind::Castle,
    BuildingKind::Market,
    BuildingKind::Monastery,
    BuildingKind::Wall,
    BuildingKind::Door,
];

/// Agents unseen this long are reclaimed by the lifecycle tracker (spec
/// §4.1 `detectStaleAgents`); no concrete value is given in the spec (see
/// DESIGN.md Open Question).
const STALE_AGENT_THRESHOLD: u32 = 300;

/// Per-team scratch the controller indexes by `TeamId`, bundled so
/// `Controller` doesn't carry five parallel maps.
#[derive(Default)]
struct TeamSlot {
    coordination: TeamCoordination,
    difficulty: DifficultyConfig,
    settlement: SettlementState,
    damaged_buildings: DamagedBuildingCache,
    roster: Vec<AgentId>,
}

pub struct Controller {
    rng: SmallRng,
    agent_states: HashMap<AgentId, AgentState>,
    teams: HashMap<TeamId, TeamSlot>,
    lifecycle: AgentLifecycleTracker,
    pathfinding: PathfindingCache,
}

impl Controller {
    pub fn new(seed: u64, map_width: usize, map_height: usize, max_agents: usize) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            agent_states: HashMap::new(),
            teams: HashMap::new(),
            lifecycle: AgentLifecycleTracker::with_capacity(max_agents),
            pathfinding: PathfindingCache::new(map_width, map_height),
        }
    }

    /// Register a newly spawned agent, assigning its role and inserting it
    /// into its team's roster in ascending-id order (spec §5: "agents are
    /// processed in ascending agent-id order").
    pub fn register_agent(&mut self, agent: AgentId, team: TeamId, role: Role) {
        self.agent_states.insert(agent, AgentState::new(role));
        let roster = &mut self.teams.entry(team).or_default().roster;
        if let Err(index) = roster.binary_search(&agent) {
            roster.insert(index, agent);
        }
    }

    pub fn set_difficulty(&mut self, team: TeamId, config: DifficultyConfig) {
        self.teams.entry(team).or_default().difficulty = config;
    }

    /// Drop an agent's slot; its `AgentState` is reclaimed immediately so a
    /// later `register_agent` for a reused id starts from a clean slate.
    fn retire_agent(&mut self, agent: AgentId, team: TeamId) {
        if let Some(state) = self.agent_states.get_mut(&agent) {
            state.reset(Role::Gatherer);
        }
        self.lifecycle.mark_inactive(agent);
        if let Some(slot) = self.teams.get_mut(&team) {
            if let Ok(index) = slot.roster.binary_search(&agent) {
                slot.roster.remove(index);
            }
        }
    }

    /// Run one simulation tick. Returns one action per agent dispatched, in
    /// ascending `(team, agent)` order.
    pub fn tick<E: Environment>(&mut self, env: &mut E) -> Vec<(AgentId, Action)> {
        let step = env.current_step();
        let team_ids: Vec<TeamId> = self.teams.keys().copied().collect();

        for &team in &team_ids {
            let roster = self.teams.get(&team).map(|s| s.roster.clone()).unwrap_or_default();
            for &agent in &roster {
                if env.is_alive(agent) {
                    self.lifecycle.mark_active(agent, step);
                } else {
                    self.retire_agent(agent, team);
                }
            }
            let stale = self.lifecycle.detect_stale_agents(step, STALE_AGENT_THRESHOLD);
            for agent in stale {
                self.retire_agent(agent, team);
            }
        }

        for &team in &team_ids {
            let is_alive = |a: AgentId| env.is_alive(a);
            let slot = self.teams.entry(team).or_default();
            slot.coordination.prune_expired(step, is_alive);
            slot.damaged_buildings.refresh(env, team, step, &ALL_BUILDING_KINDS);
        }

        for &team in &team_ids {
            let roster = self.teams.get(&team).map(|s| s.roster.clone()).unwrap_or_default();
            let mut settlement = self.teams.get(&team).map(|s| s.settlement).unwrap_or_default();
            Settlement::tick(env, team, &roster, step, &mut settlement);
            self.teams.entry(team).or_default().settlement = settlement;
        }

        let mut results = Vec::new();
        for &team in &team_ids {
            let decision_delayed = {
                let difficulty = self.teams.entry(team).or_default().difficulty;
                self.rng.gen::<f32>() < difficulty.decision_delay_chance()
            };
            let roster = self.teams.get(&team).map(|s| s.roster.clone()).unwrap_or_default();
            for agent in roster {
                if !env.is_alive(agent) {
                    continue;
                }
                let action = if decision_delayed { Action::NOOP } else { self.dispatch(env, team, agent, step) };
                results.push((agent, action));
            }
        }
        results
    }

    /// Build a fresh catalog for the agent's role and drive one arbitration
    /// step (spec §4.2). The catalog is rebuilt per call rather than cached,
    /// since its boxed `OptionDef`s are zero-sized and the borrow they close
    /// over (this agent's `RoleCtx`) is itself reconstructed per call.
    fn dispatch<E: Environment>(&mut self, env: &mut E, team: TeamId, agent: AgentId, step: u32) -> Action {
        let role = self.agent_states.get(&agent).map(|s| s.role).unwrap_or(Role::Gatherer);
        let slot = self.teams.entry(team).or_default();
        let Some(state) = self.agent_states.get_mut(&agent) else {
            return Action::NOOP;
        };
        let mut arbitration = state.arbitration;
        let mut ctx = RoleCtx {
            env,
            agent,
            team,
            state,
            coordination: &mut slot.coordination,
            difficulty: &slot.difficulty,
            rng: &mut self.rng,
            step,
            pathfinding: &mut self.pathfinding,
            damaged_buildings: &slot.damaged_buildings,
        };
        let action = match role {
            Role::Gatherer => run_options(&mut arbitration, &crate::roles::gatherer::catalog::<E>(), &mut ctx),
            Role::Builder => run_options(&mut arbitration, &crate::roles::builder::catalog::<E>(), &mut ctx),
            Role::Fighter => run_options(&mut arbitration, &crate::roles::fighter::catalog::<E>(), &mut ctx),
        };
        ctx.state.arbitration = arbitration;
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::shared::test_env::FakeEnv;

    #[test]
    fn register_agent_keeps_roster_sorted_ascending() {
        let mut controller = Controller::new(1, 64, 64, 16);
        controller.register_agent(AgentId(5), TeamId(0), Role::Gatherer);
        controller.register_agent(AgentId(1), TeamId(0), Role::Gatherer);
        controller.register_agent(AgentId(3), TeamId(0), Role::Gatherer);
        let roster = controller.teams.get(&TeamId(0)).unwrap().roster.clone();
        assert_eq!(roster, vec![AgentId(1), AgentId(3), AgentId(5)]);
    }

    #[test]
    fn dead_agents_are_retired_and_dropped_from_the_roster() {
        let mut controller = Controller::new(1, 64, 64, 16);
        controller.register_agent(AgentId(1), TeamId(0), Role::Gatherer);
        let mut env = FakeEnv::new();
        // FakeEnv reports an agent alive only once placed; never placing it
        // means `tick` should retire it immediately.
        let _ = controller.tick(&mut env);
        assert!(controller.teams.get(&TeamId(0)).unwrap().roster.is_empty());
    }

    #[test]
    fn tick_dispatches_one_action_per_live_agent() {
        let mut controller = Controller::new(1, 64, 64, 16);
        let agent = AgentId(1);
        controller.register_agent(agent, TeamId(0), Role::Gatherer);
        let mut env = FakeEnv::new();
        env.place(agent, TeamId(0), crate::geometry::Position::new(0, 0));
        let results = controller.tick(&mut env);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, agent);
    }
}
