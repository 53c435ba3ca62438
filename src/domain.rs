//! Small closed-world enums and ids shared across the controller. These are
//! the crate's view of the environment's vocabulary (spec §6): the core
//! never invents new resource/building/unit kinds, it only reasons about the
//! fixed set the environment exposes.

use serde::{Deserialize, Serialize};

/// Up to 255 teams; two bytes would be wasteful for anything this spec's
/// scale (spec caps per-team buffers at 64, so teams are few).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u8);

/// Dense index into `Controller::agents`; stable for the lifetime of the
/// agent's slot (spec §3: `AgentState[MapAgents]`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    /// Sentinel used where the spec calls for "-1" (no enemy, no owner, ...).
    pub const NONE: AgentId = AgentId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Per-agent behavioral policy (spec §4.7 "Stance gates").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Aggressive,
    Defensive,
    StandGround,
    NoAttack,
}

/// Broad unit classification, used to gate role-specific behaviors
/// (BatteringRamAdvance, naval behaviors, scout behaviors, siege conversion, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitClass {
    Villager,
    MeleeInfantry,
    RangedInfantry,
    Scout,
    LightCavalry,
    Hussar,
    Monk,
    BatteringRam,
    Mangonel,
    Siege,
    DemoShip,
    FishingShip,
    Galley,
    FireShip,
    CannonGalleon,
    TransportShip,
}

/// Raw resource kinds tracked in team stockpiles (spec §4.5 gatherer weights).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Food,
    Wood,
    Stone,
    Gold,
}

impl Resource {
    pub const ALL: [Resource; 4] = [Resource::Food, Resource::Wood, Resource::Stone, Resource::Gold];
}

/// Which resource the team's economy is currently bottlenecked on
/// (spec §4.5 `update_gatherer_task`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bottleneck {
    None,
    FoodCritical,
    WoodCritical,
}

/// Buildable/placeable structure kinds referenced by the builder catalog and
/// settlement founding (spec §4.6, §4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Altar,
    TownCenter,
    Granary,
    LumberCamp,
    Quarry,
    MiningCamp,
    Mill,
    House,
    WeavingLoom,
    ClayOven,
    Blacksmith,
    Barracks,
    ArcheryRange,
    Stable,
    SiegeWorkshop,
    MangonelWorkshop,
    Outpost,
    Castle,
    Market,
    Monastery,
    Wall,
    Door,
}

impl BuildingKind {
    /// Spec §4.6 step 6: "first missing among {Granary, LumberCamp, Quarry, MiningCamp}".
    pub const CORE_INFRASTRUCTURE: [BuildingKind; 4] =
        [BuildingKind::Granary, BuildingKind::LumberCamp, BuildingKind::Quarry, BuildingKind::MiningCamp];

    /// Spec §4.6 step 9: the tech set.
    pub const TECH_SET: [BuildingKind; 12] = [
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
    ];
}

/// Non-building "thing" kinds iterated via `things_by_kind` (spec §6):
/// resource nodes, wildlife, and hazards the catalogs react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingKind {
    Tree,
    Stump,
    GoldVein,
    Stone,
    Stalagmite,
    Wheat,
    Stubble,
    Fertile,
    Cow,
    Skeleton,
    Tumor,
    Spawner,
    Goblin,
    Relic,
    FrozenTile,
    Lantern,
}

/// Coordination request priority (spec §3 `CoordinationRequest`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
}

/// Coordination request kind (spec §3 `CoordinationRequest`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Protection,
    Defense,
    SiegeBuild,
}

/// Difficulty tier (spec §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Easy,
    Normal,
    Hard,
    Brutal,
}
