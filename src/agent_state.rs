//! `AgentState` (spec §3): the per-agent scratch an agent's options read and
//! write across ticks. Created once per agent slot, mutated only by that
//! agent's own options, reset by the lifecycle tracker when the agent dies.

use crate::domain::AgentId;
use crate::geometry::{Direction, Position};
use crate::options::ArbitrationState;

pub const RECENT_POSITIONS_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Gatherer,
    Builder,
    Fighter,
}

/// Gatherer sub-task (spec §4.5 `update_gatherer_task`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GathererTask {
    Food,
    Wood,
    Stone,
    Gold,
    Hearts,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EscapeMode {
    pub active: bool,
    pub counter: u32,
    pub direction: Option<Direction>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BlockedMove {
    pub direction: Option<Direction>,
    pub steps: u32,
}

/// A per-kind cached "closest thing" lookup with the step it was computed on.
#[derive(Clone, Copy, Debug)]
pub struct StaleCachedPosition {
    pub position: Position,
    pub cached_step: u32,
}

#[derive(Clone, Debug, Default)]
pub struct BuildIntent {
    pub target: Option<Position>,
    pub stand: Option<Position>,
    pub index: Option<usize>,
    pub lock: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PlannedPath {
    pub path: Vec<Position>,
    pub index: usize,
    pub blocked_target: Option<Position>,
}

/// Waypoint-following parameters shared by patrol/attack-move/guard/follow.
#[derive(Clone, Debug, Default)]
pub struct MovementOrder {
    pub waypoints: Vec<Position>,
    pub waypoint_index: usize,
    pub follow_target: Option<AgentId>,
    pub rally_point: Option<Position>,
    pub holding: bool,
    pub stopped: bool,
}

pub struct AgentState {
    pub role: Role,
    pub arbitration: ArbitrationState,
    pub gatherer_task: Option<GathererTask>,
    pub last_engaged_enemy: Option<(AgentId, u32)>,
    /// Set by the monk's relic-collection sub-mode, cleared on deposit
    /// at a monastery (spec §4.7 "Monk behavior").
    pub holding_relic: bool,
    pub spiral_cursor: u32,
    pub recent_positions: [Option<Position>; RECENT_POSITIONS_LEN],
    pub recent_positions_head: usize,
    pub escape_mode: EscapeMode,
    pub blocked_move: BlockedMove,
    pub cached_thing_positions: Vec<(Position, u32)>,
    pub closest_of_kind: Vec<Position>,
    pub build_intent: BuildIntent,
    pub planned_path: PlannedPath,
    pub movement_order: MovementOrder,
    /// Cached target-enemy score evaluation step (spec §4.7 `TargetSwapInterval`).
    pub target_eval_step: u32,
    pub target_eval_enemy: Option<AgentId>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new(Role::Gatherer)
    }
}

impl AgentState {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            arbitration: ArbitrationState::default(),
            gatherer_task: None,
            last_engaged_enemy: None,
            holding_relic: false,
            spiral_cursor: 0,
            recent_positions: [None; RECENT_POSITIONS_LEN],
            recent_positions_head: 0,
            escape_mode: EscapeMode::default(),
            blocked_move: BlockedMove::default(),
            cached_thing_positions: Vec::new(),
            closest_of_kind: Vec::new(),
            build_intent: BuildIntent::default(),
            planned_path: PlannedPath::default(),
            movement_order: MovementOrder::default(),
            target_eval_step: 0,
            target_eval_enemy: None,
        }
    }

    /// Push a position into the fixed-length recent-positions ring
    /// (spec §3: "recent-positions ring (length 12)").
    pub fn push_recent_position(&mut self, pos: Position) {
        self.recent_positions[self.recent_positions_head] = Some(pos);
        self.recent_positions_head = (self.recent_positions_head + 1) % RECENT_POSITIONS_LEN;
    }

    pub fn recent_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.recent_positions.iter().filter_map(|p| *p)
    }

    /// Reset to a fresh slot, as done when the lifecycle tracker reclaims an
    /// agent's state after death (spec §3: "reset when agent dies").
    pub fn reset(&mut self, role: Role) {
        *self = Self::new(role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_positions_ring_wraps_at_fixed_length() {
        let mut state = AgentState::new(Role::Gatherer);
        for i in 0..(RECENT_POSITIONS_LEN as i32 + 3) {
            state.push_recent_position(Position::new(i, 0));
        }
        let positions: Vec<_> = state.recent_positions().collect();
        assert_eq!(positions.len(), RECENT_POSITIONS_LEN);
    }

    #[test]
    fn reset_clears_arbitration_and_gatherer_task() {
        let mut state = AgentState::new(Role::Gatherer);
        state.gatherer_task = Some(GathererTask::Wood);
        state.arbitration.active = Some(3);
        state.reset(Role::Builder);
        assert_eq!(state.role, Role::Builder);
        assert_eq!(state.gatherer_task, None);
        assert_eq!(state.arbitration.active, None);
    }
}
