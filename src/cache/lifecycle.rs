//! Agent lifecycle tracker (spec §4.1): bit-array bookkeeping of which
//! agents are active, when they were last seen, and whether they need
//! cleanup -- used by the controller to reclaim `AgentState` slots for dead
//! or long-idle agents without a full scan every step.

use crate::domain::AgentId;

#[derive(Default)]
pub struct AgentLifecycleTracker {
    active: Vec<bool>,
    last_active_step: Vec<u32>,
    needs_cleanup: Vec<bool>,
}

impl AgentLifecycleTracker {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: vec![false; capacity],
            last_active_step: vec![0; capacity],
            needs_cleanup: vec![false; capacity],
        }
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.active.len() {
            self.active.resize(index + 1, false);
            self.last_active_step.resize(index + 1, 0);
            self.needs_cleanup.resize(index + 1, false);
        }
    }

    /// Clears the cleanup flag and updates the last-seen step.
    pub fn mark_active(&mut self, agent: AgentId, step: u32) {
        let index = agent.0 as usize;
        self.ensure_capacity(index);
        self.active[index] = true;
        self.last_active_step[index] = step;
        self.needs_cleanup[index] = false;
    }

    /// Sets the cleanup flag only if the agent was formerly active.
    pub fn mark_inactive(&mut self, agent: AgentId) {
        let index = agent.0 as usize;
        self.ensure_capacity(index);
        if self.active[index] {
            self.needs_cleanup[index] = true;
        }
        self.active[index] = false;
    }

    pub fn is_active(&self, agent: AgentId) -> bool {
        self.active.get(agent.0 as usize).copied().unwrap_or(false)
    }

    pub fn needs_cleanup(&self, agent: AgentId) -> bool {
        self.needs_cleanup.get(agent.0 as usize).copied().unwrap_or(false)
    }

    pub fn clear_cleanup(&mut self, agent: AgentId) {
        if let Some(flag) = self.needs_cleanup.get_mut(agent.0 as usize) {
            *flag = false;
        }
    }

    /// Marks every agent inactive that hasn't been seen within `threshold`
    /// steps of `current`, returning their ids.
    pub fn detect_stale_agents(&mut self, current: u32, threshold: u32) -> Vec<AgentId> {
        let mut stale = Vec::new();
        for index in 0..self.active.len() {
            if self.active[index] && current.saturating_sub(self.last_active_step[index]) > threshold {
                self.active[index] = false;
                self.needs_cleanup[index] = true;
                stale.push(AgentId(index as u32));
            }
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_inactive_only_flags_formerly_active_agents() {
        let mut tracker = AgentLifecycleTracker::with_capacity(4);
        let agent = AgentId(2);
        tracker.mark_inactive(agent);
        assert!(!tracker.needs_cleanup(agent), "never-active agent shouldn't need cleanup");

        tracker.mark_active(agent, 10);
        tracker.mark_inactive(agent);
        assert!(tracker.needs_cleanup(agent));
    }

    #[test]
    fn detect_stale_agents_respects_threshold() {
        let mut tracker = AgentLifecycleTracker::with_capacity(4);
        let agent = AgentId(1);
        tracker.mark_active(agent, 0);

        assert!(tracker.detect_stale_agents(5, 10).is_empty());
        let stale = tracker.detect_stale_agents(11, 10);
        assert_eq!(stale, vec![agent]);
        assert!(!tracker.is_active(agent));
    }
}
