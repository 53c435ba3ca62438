//! Difficulty tiers and decision-delay simulation (spec §4.4).

use serde::{Deserialize, Serialize};

use crate::domain::DifficultyLevel;

/// Default target territory fraction the `adaptive` flag steers toward.
pub const DEFAULT_ADAPTIVE_TARGET_TERRITORY_FRACTION: f32 = 0.5;

/// Per-team difficulty configuration. Deserializable so a host process can
/// load it from its own config file alongside the rest of a match's setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub level: DifficultyLevel,
    pub threat_response: bool,
    pub advanced_targeting: bool,
    pub coordination: bool,
    pub optimal_build_order: bool,
    pub adaptive: bool,
    pub adaptive_target_territory_fraction: f32,
    pub last_adaptive_check: u32,
}

impl DifficultyConfig {
    /// `decisionDelayChance`: probability the controller short-circuits to
    /// no-op this tick to simulate reaction time.
    pub fn decision_delay_chance(&self) -> f32 {
        match self.level {
            DifficultyLevel::Easy => 0.30,
            DifficultyLevel::Normal => 0.10,
            DifficultyLevel::Hard => 0.02,
            DifficultyLevel::Brutal => 0.0,
        }
    }

    pub fn for_level(level: DifficultyLevel) -> Self {
        let (threat_response, advanced_targeting, coordination, optimal_build_order) = match level {
            DifficultyLevel::Easy => (false, false, false, false),
            DifficultyLevel::Normal => (true, true, true, false),
            DifficultyLevel::Hard => (true, true, true, true),
            DifficultyLevel::Brutal => (true, true, true, true),
        };
        Self {
            level,
            threat_response,
            advanced_targeting,
            coordination,
            optimal_build_order,
            adaptive: false,
            adaptive_target_territory_fraction: DEFAULT_ADAPTIVE_TARGET_TERRITORY_FRACTION,
            last_adaptive_check: 0,
        }
    }

    /// Raise or lower the tier toward `target_territory_fraction`, only when
    /// `adaptive` is set and `cadence` steps have elapsed since the last check.
    pub fn maybe_adapt(&mut self, current_step: u32, cadence: u32, controlled_territory_fraction: f32) {
        if !self.adaptive || current_step.saturating_sub(self.last_adaptive_check) < cadence {
            return;
        }
        self.last_adaptive_check = current_step;
        let target = self.adaptive_target_territory_fraction;
        let next_level = if controlled_territory_fraction > target + 0.1 {
            self.level.step_up()
        } else if controlled_territory_fraction < target - 0.1 {
            self.level.step_down()
        } else {
            self.level
        };
        if next_level != self.level {
            let target_fraction = self.adaptive_target_territory_fraction;
            *self = Self::for_level(next_level);
            self.adaptive = true;
            self.adaptive_target_territory_fraction = target_fraction;
            self.last_adaptive_check = current_step;
        }
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::for_level(DifficultyLevel::Normal)
    }
}

impl DifficultyLevel {
    fn step_up(self) -> Self {
        match self {
            DifficultyLevel::Easy => DifficultyLevel::Normal,
            DifficultyLevel::Normal => DifficultyLevel::Hard,
            DifficultyLevel::Hard | DifficultyLevel::Brutal => DifficultyLevel::Brutal,
        }
    }

    fn step_down(self) -> Self {
        match self {
            DifficultyLevel::Brutal => DifficultyLevel::Hard,
            DifficultyLevel::Hard => DifficultyLevel::Normal,
            DifficultyLevel::Normal | DifficultyLevel::Easy => DifficultyLevel::Easy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brutal_has_zero_decision_delay_and_all_toggles() {
        let cfg = DifficultyConfig::for_level(DifficultyLevel::Brutal);
        assert_eq!(cfg.decision_delay_chance(), 0.0);
        assert!(cfg.threat_response && cfg.advanced_targeting && cfg.coordination && cfg.optimal_build_order);
    }

    #[test]
    fn easy_has_highest_decision_delay_and_no_toggles() {
        let cfg = DifficultyConfig::for_level(DifficultyLevel::Easy);
        assert_eq!(cfg.decision_delay_chance(), 0.30);
        assert!(!cfg.threat_response && !cfg.advanced_targeting && !cfg.coordination && !cfg.optimal_build_order);
    }

    #[test]
    fn maybe_adapt_ignores_non_adaptive_configs() {
        let mut cfg = DifficultyConfig::for_level(DifficultyLevel::Normal);
        cfg.maybe_adapt(1000, 10, 0.9);
        assert_eq!(cfg.level, DifficultyLevel::Normal);
    }

    #[test]
    fn maybe_adapt_steps_up_when_far_above_target_and_respects_cadence() {
        let mut cfg = DifficultyConfig::for_level(DifficultyLevel::Normal);
        cfg.adaptive = true;
        cfg.maybe_adapt(5, 10, 0.9);
        assert_eq!(cfg.level, DifficultyLevel::Normal, "cadence not yet elapsed");
        cfg.maybe_adapt(10, 10, 0.9);
        assert_eq!(cfg.level, DifficultyLevel::Hard);
    }
}
