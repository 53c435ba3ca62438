//! A scripted multi-agent controller for a grid-based real-time-strategy
//! simulator: a per-tick option-arbitration engine, a generation-stamped
//! cache substrate, a team coordination bus, and role-specific catalogs for
//! Gatherer, Builder, and Fighter agents, plus the settlement/town-split
//! state machine that grows a team onto new sites.
//!
//! The crate has no I/O of its own. A host process implements [`env::Environment`]
//! over its own world state and drives the simulation by calling
//! [`controller::Controller::tick`] once per step.

pub mod action;
pub mod agent_state;
pub mod cache;
#[cfg(feature = "catalog")]
pub mod catalog;
pub mod controller;
pub mod coordination;
pub mod difficulty;
pub mod domain;
pub mod env;
pub mod geometry;
pub mod logging;
pub mod options;
pub mod pathfinding;
pub mod roles;
pub mod settlement;

pub use action::{Action, Verb};
pub use agent_state::{AgentState, Role};
pub use controller::Controller;
pub use difficulty::DifficultyConfig;
pub use domain::{AgentId, TeamId};
pub use env::Environment;
