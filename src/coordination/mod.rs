//! The coordination bus (spec §4.3): three team-indexed stores -- threat
//! map, coordination requests, resource reservations -- that let roles
//! cooperate without a global lock. Mutated exclusively by the controller
//! during its tick; readers within the same tick see writes as soon as
//! they happen (spec §5 ordering guarantees).

mod reservations;
mod requests;
mod threat;

pub use reservations::{ReservationTable, ResourceReservation, RESERVATION_CAPACITY, RESERVATION_MAX_AGE};
pub use requests::{CoordinationRequest, RequestRing, PROTECTION_RESPONSE_RADIUS, REQUEST_MAX_AGE, REQUEST_RING_CAPACITY};
pub use threat::{ThreatEntry, ThreatMap, THREAT_MAP_CAPACITY, THREAT_RECENCY_WINDOW};

use crate::domain::AgentId;

/// Per-team bundle of the three coordination stores. `Controller` owns one
/// of these per team (spec §9: "encapsulate them in the Controller struct").
#[derive(Default)]
pub struct TeamCoordination {
    pub threat_map: ThreatMap,
    pub requests: RequestRing,
    pub reservations: ReservationTable,
}

impl TeamCoordination {
    pub fn new() -> Self {
        Self { threat_map: ThreatMap::new(), requests: RequestRing::new(), reservations: ReservationTable::new() }
    }

    /// Prune every expired entry across the three stores. Called once per
    /// team at the start of each tick, before any agent in that team acts.
    pub fn prune_expired(&mut self, step: u32, is_alive: impl Fn(AgentId) -> bool) {
        self.threat_map.prune_expired(step);
        self.requests.clear_expired(step);
        self.reservations.clear_expired(step, is_alive);
    }
}
