//! Grid geometry shared by every module: positions, the 8-connected
//! direction set, Chebyshev distance, and the deterministic spiral search
//! used for wandering/exploration (gatherer fallback search, scout
//! exploration, settlement site scoring).

use serde::{Deserialize, Serialize};

/// A tile position on the shared grid. Both coordinates are signed so that
/// off-map candidates can be represented and rejected by `Environment::is_valid_pos`
/// rather than wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The 8-connected grid metric used everywhere in this crate.
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }

    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    /// True if `self` sits on a cardinal or diagonal axis through `center` --
    /// used by the builder's wall-ring to mark door slots.
    pub fn on_axis_through(self, center: Position) -> bool {
        self.x == center.x || self.y == center.y || (self.x - center.x).abs() == (self.y - center.y).abs()
    }
}

/// The eight compass directions used by every move-step/flee/kite behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// The direction index used by `Action::encode`'s `arg` field.
    pub const fn index(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::NorthEast => 1,
            Direction::East => 2,
            Direction::SouthEast => 3,
            Direction::South => 4,
            Direction::SouthWest => 5,
            Direction::West => 6,
            Direction::NorthWest => 7,
        }
    }

    pub const fn from_index(index: u8) -> Option<Direction> {
        Some(match index {
            0 => Direction::North,
            1 => Direction::NorthEast,
            2 => Direction::East,
            3 => Direction::SouthEast,
            4 => Direction::South,
            5 => Direction::SouthWest,
            6 => Direction::West,
            7 => Direction::NorthWest,
            _ => return None,
        })
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    /// The two directions perpendicular to this one, used by kiting strafes.
    pub const fn perpendiculars(self) -> (Direction, Direction) {
        match self {
            Direction::North | Direction::South => (Direction::East, Direction::West),
            Direction::East | Direction::West => (Direction::North, Direction::South),
            Direction::NorthEast | Direction::SouthWest => (Direction::NorthWest, Direction::SouthEast),
            Direction::NorthWest | Direction::SouthEast => (Direction::NorthEast, Direction::SouthWest),
        }
    }

    /// The direction from `from` toward `to`, snapped to the nearest of the
    /// eight candidates. Returns `None` if the points coincide.
    pub fn towards(from: Position, to: Position) -> Option<Direction> {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        Direction::ALL.into_iter().find(|d| d.delta() == (dx, dy))
    }
}

/// Deterministic outward ring enumeration around a center point, used by
/// gatherer fallback search, scout exploration, and settlement site scoring.
/// Each successive ring is walked in a fixed clockwise order starting north,
/// so two callers given the same center and radius bound visit candidates in
/// the same order -- required for the crate's determinism guarantee (spec §5/§8 S7).
pub struct SpiralSearch {
    center: Position,
    radius: u32,
    max_radius: u32,
    ring_index: usize,
    ring_cells: Vec<Position>,
}

impl SpiralSearch {
    pub fn new(center: Position, max_radius: u32) -> Self {
        let mut search = Self {
            center,
            radius: 0,
            max_radius,
            ring_index: 0,
            ring_cells: vec![center],
        };
        if max_radius == 0 {
            search.ring_cells = vec![center];
        }
        search
    }

    fn build_ring(center: Position, radius: u32) -> Vec<Position> {
        if radius == 0 {
            return vec![center];
        }
        let r = radius as i32;
        let mut cells = Vec::with_capacity((8 * radius) as usize);
        // Walk the ring clockwise starting at due north, matching `Direction::ALL`'s
        // orientation so ring order and direction order agree.
        for x in -r..=r {
            cells.push(Position::new(center.x + x, center.y - r));
        }
        for y in (-r + 1)..=r {
            cells.push(Position::new(center.x + r, center.y + y));
        }
        for x in (-r..r).rev() {
            cells.push(Position::new(center.x + x, center.y + r));
        }
        for y in (-r + 1..r).rev() {
            cells.push(Position::new(center.x - r, center.y + y));
        }
        cells
    }
}

impl Iterator for SpiralSearch {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        loop {
            if self.ring_index >= self.ring_cells.len() {
                self.radius += 1;
                if self.radius > self.max_radius {
                    return None;
                }
                self.ring_cells = Self::build_ring(self.center, self.radius);
                self.ring_index = 0;
            }
            if self.ring_index < self.ring_cells.len() {
                let cell = self.ring_cells[self.ring_index];
                self.ring_index += 1;
                return Some(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance_is_max_of_axes() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 1);
        assert_eq!(a.chebyshev_distance(b), 3);
    }

    #[test]
    fn direction_round_trips_through_index() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
    }

    #[test]
    fn direction_opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn spiral_search_visits_center_first() {
        let mut search = SpiralSearch::new(Position::new(5, 5), 2);
        assert_eq!(search.next(), Some(Position::new(5, 5)));
    }

    #[test]
    fn spiral_search_visits_first_ring_at_distance_one() {
        let search = SpiralSearch::new(Position::new(0, 0), 1);
        let cells: Vec<_> = search.collect();
        assert_eq!(cells[0], Position::new(0, 0));
        for cell in &cells[1..] {
            assert_eq!(Position::new(0, 0).chebyshev_distance(*cell), 1);
        }
        assert_eq!(cells.len(), 1 + 8);
    }

    #[test]
    fn spiral_search_terminates_at_max_radius() {
        let search = SpiralSearch::new(Position::new(0, 0), 3);
        let count = search.count();
        // center + ring(1)=8 + ring(2)=16 + ring(3)=24
        assert_eq!(count, 1 + 8 + 16 + 24);
    }
}
