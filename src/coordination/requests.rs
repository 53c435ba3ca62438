//! Per-team coordination request ring (spec §4.3): protection/defense/siege
//! requests that let roles cooperate without a global lock. Capacity 16,
//! FIFO eviction on overflow, duplicate suppression within 30 steps,
//! expiry after 60 steps or once fulfilled.

use crate::domain::{AgentId, Priority, RequestKind};
use crate::geometry::Position;

pub const REQUEST_RING_CAPACITY: usize = 16;
pub const REQUEST_DEDUP_WINDOW: u32 = 30;
pub const REQUEST_MAX_AGE: u32 = 60;
pub const PROTECTION_RESPONSE_RADIUS: u32 = 15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinationRequest {
    pub kind: RequestKind,
    pub requester: AgentId,
    pub position: Position,
    pub threat_position: Position,
    pub created_step: u32,
    pub fulfilled: bool,
    pub priority: Priority,
}

#[derive(Default)]
pub struct RequestRing {
    requests: Vec<CoordinationRequest>,
}

fn is_duplicate(existing: &CoordinationRequest, requester: AgentId, kind: RequestKind, step: u32) -> bool {
    existing.requester == requester && existing.kind == kind && step.saturating_sub(existing.created_step) < REQUEST_DEDUP_WINDOW
}

impl RequestRing {
    pub fn new() -> Self {
        Self { requests: Vec::with_capacity(REQUEST_RING_CAPACITY) }
    }

    pub fn count(&self) -> usize {
        self.requests.len()
    }

    /// Returns `false` if suppressed as a duplicate of a recent request from
    /// the same requester+kind; otherwise appends (evicting the oldest FIFO
    /// entry first if at capacity) and returns `true`.
    pub fn add_request(
        &mut self,
        kind: RequestKind,
        requester: AgentId,
        pos: Position,
        threat_pos: Position,
        step: u32,
        priority: Priority,
    ) -> bool {
        if self.requests.iter().any(|r| is_duplicate(r, requester, kind, step)) {
            return false;
        }
        if self.requests.len() >= REQUEST_RING_CAPACITY {
            self.requests.remove(0);
        }
        self.requests.push(CoordinationRequest {
            kind,
            requester,
            position: pos,
            threat_position: threat_pos,
            created_step: step,
            fulfilled: false,
            priority,
        });
        true
    }

    /// Drop fulfilled requests and those older than `REQUEST_MAX_AGE` steps.
    pub fn clear_expired(&mut self, step: u32) {
        self.requests.retain(|r| !r.fulfilled && step.saturating_sub(r.created_step) < REQUEST_MAX_AGE);
    }

    /// Nearest unfulfilled request to `pos` within the response radius,
    /// ordered by `(priority DESC, Chebyshev distance ASC)`.
    pub fn find_nearest_protection(&self, pos: Position) -> Option<&CoordinationRequest> {
        self.requests
            .iter()
            .filter(|r| !r.fulfilled && pos.chebyshev_distance(r.position) <= PROTECTION_RESPONSE_RADIUS)
            .min_by(|a, b| {
                b.priority.cmp(&a.priority).then_with(|| pos.chebyshev_distance(a.position).cmp(&pos.chebyshev_distance(b.position)))
            })
    }

    pub fn has_unfulfilled(&self, kind: RequestKind) -> bool {
        self.requests.iter().any(|r| r.kind == kind && !r.fulfilled)
    }

    /// Marks the highest-priority unfulfilled request of `kind` as fulfilled.
    pub fn mark_fulfilled(&mut self, kind: RequestKind) -> bool {
        let target = self
            .requests
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == kind && !r.fulfilled)
            .max_by_key(|(_, r)| r.priority)
            .map(|(i, _)| i);
        if let Some(index) = target {
            self.requests[index].fulfilled = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_from_same_requester_and_kind_is_suppressed_within_window() {
        let mut ring = RequestRing::new();
        let pos = Position::new(1, 1);
        assert!(ring.add_request(RequestKind::Protection, AgentId(7), pos, pos, 100, Priority::Normal));
        assert!(!ring.add_request(RequestKind::Protection, AgentId(7), pos, pos, 110, Priority::Normal));
        assert!(ring.add_request(RequestKind::Protection, AgentId(7), pos, pos, 140, Priority::Normal));
        assert_eq!(ring.count(), 2);
    }

    #[test]
    fn add_request_at_capacity_evicts_oldest_and_appends() {
        let mut ring = RequestRing::new();
        let pos = Position::new(0, 0);
        for i in 0..REQUEST_RING_CAPACITY {
            ring.add_request(RequestKind::Defense, AgentId(i as u32), pos, pos, i as u32 * 100, Priority::Normal);
        }
        assert_eq!(ring.count(), REQUEST_RING_CAPACITY);
        ring.add_request(RequestKind::Defense, AgentId(999), pos, pos, 100_000, Priority::Normal);
        assert_eq!(ring.count(), REQUEST_RING_CAPACITY);
        assert!(!ring.requests.iter().any(|r| r.requester == AgentId(0)));
        assert!(ring.requests.iter().any(|r| r.requester == AgentId(999)));
    }

    #[test]
    fn clear_expired_drops_entries_older_than_max_age() {
        let mut ring = RequestRing::new();
        let pos = Position::new(0, 0);
        ring.add_request(RequestKind::Protection, AgentId(1), pos, pos, 0, Priority::Low);
        ring.clear_expired(REQUEST_MAX_AGE - 1);
        assert_eq!(ring.count(), 1);
        ring.clear_expired(REQUEST_MAX_AGE);
        assert_eq!(ring.count(), 0);
    }

    #[test]
    fn find_nearest_protection_orders_by_priority_then_distance() {
        let mut ring = RequestRing::new();
        ring.add_request(RequestKind::Protection, AgentId(1), Position::new(10, 0), Position::new(10, 0), 0, Priority::Low);
        ring.add_request(RequestKind::Protection, AgentId(2), Position::new(5, 0), Position::new(5, 0), 0, Priority::High);
        let nearest = ring.find_nearest_protection(Position::new(0, 0)).unwrap();
        assert_eq!(nearest.requester, AgentId(2), "High priority should win even though it is farther in this set");
    }

    #[test]
    fn mark_fulfilled_picks_highest_priority_unfulfilled() {
        let mut ring = RequestRing::new();
        let pos = Position::new(0, 0);
        ring.add_request(RequestKind::SiegeBuild, AgentId(1), pos, pos, 0, Priority::Low);
        ring.add_request(RequestKind::SiegeBuild, AgentId(2), pos, pos, 5, Priority::High);
        assert!(ring.mark_fulfilled(RequestKind::SiegeBuild));
        assert!(ring.requests.iter().find(|r| r.requester == AgentId(2)).unwrap().fulfilled);
        assert!(!ring.requests.iter().find(|r| r.requester == AgentId(1)).unwrap().fulfilled);
    }
}
