//! The evolutionary role-catalog persistence companion (spec §6, §9 "Redesign
//! Flags"). Out of core scope -- this crate never mutates fitness/games/wins
//! or runs a genetic algorithm over behaviors -- but the wire format is part
//! of the external interface, so it's defined here behind the `catalog`
//! feature as a thin serde round-trip, the way `serde_json` is idiomatically
//! paired with a `thiserror` error type elsewhere in this corpus.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Fixed,
    Shuffle,
    Weighted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tier {
    pub selection: Selection,
    pub behaviors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,
    pub kind: String,
    pub origin: String,
    pub locked: bool,
    pub fitness: f32,
    pub games: u32,
    pub wins: u32,
    pub tiers: Vec<Tier>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorEntry {
    pub name: String,
    pub fitness: f32,
    pub games: u32,
    pub uses: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub roles: Vec<RoleEntry>,
    pub behaviors: Vec<BehaviorEntry>,
    pub next_name_id: u32,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Catalog {
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let catalog = Catalog {
            roles: vec![RoleEntry {
                name: "gatherer-1".into(),
                kind: "gatherer".into(),
                origin: "seed".into(),
                locked: false,
                fitness: 0.5,
                games: 10,
                wins: 4,
                tiers: vec![Tier { selection: Selection::Fixed, behaviors: vec!["haul_food".into()], weights: None }],
            }],
            behaviors: vec![BehaviorEntry { name: "haul_food".into(), fitness: 0.5, games: 10, uses: 30 }],
            next_name_id: 2,
        };
        let json = catalog.to_json().unwrap();
        let parsed = Catalog::from_json(&json).unwrap();
        assert_eq!(parsed.roles.len(), 1);
        assert_eq!(parsed.next_name_id, 2);
        assert_eq!(parsed.roles[0].tiers[0].selection, Selection::Fixed);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Catalog::from_json("not json").is_err());
    }
}
