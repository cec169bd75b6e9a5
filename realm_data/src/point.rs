//! Grid points and the six-neighbour hex grid.
//!
//! Valid points satisfy `(x + y) % 2 == 0`. Horizontal neighbours are two
//! columns apart, diagonal neighbours one column and one row apart. The y axis
//! points up: `up_left` has a larger y than the point itself.

use serde::{Deserialize, Serialize};

/// A point on the game grid. Used as a map key by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn left(self) -> Self {
        Self::new(self.x - 2, self.y)
    }

    pub const fn right(self) -> Self {
        Self::new(self.x + 2, self.y)
    }

    pub const fn up_left(self) -> Self {
        Self::new(self.x - 1, self.y + 1)
    }

    pub const fn up_right(self) -> Self {
        Self::new(self.x + 1, self.y + 1)
    }

    pub const fn down_left(self) -> Self {
        Self::new(self.x - 1, self.y - 1)
    }

    pub const fn down_right(self) -> Self {
        Self::new(self.x + 1, self.y - 1)
    }

    /// The six surrounding points (the 1-ring), starting east and going clockwise.
    pub const fn neighbors(self) -> [Point; 6] {
        [
            self.right(),
            self.down_right(),
            self.down_left(),
            self.left(),
            self.up_left(),
            self.up_right(),
        ]
    }

    /// Whether the point lies on the grid lattice.
    pub const fn is_on_grid(self) -> bool {
        (self.x + self.y).rem_euclid(2) == 0
    }

    /// Snaps a fractional game position to the nearest lattice point.
    ///
    /// Rounds the row first, then picks the nearest column with matching parity.
    pub fn nearest(x: f32, y: f32) -> Self {
        let row = y.round() as i32;
        let mut column = x.round() as i32;

        if (column + row).rem_euclid(2) != 0 {
            // Off-lattice column: step toward the fractional x
            column += if x >= column as f32 { 1 } else { -1 };
        }

        Self::new(column, row)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Facing direction of a unit sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    /// Derives the facing direction from a movement vector `to - from`.
    ///
    /// Zero-length movement faces east.
    pub fn between(from: Point, to: Point) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;

        match (dx.signum(), dy.signum()) {
            (1, 0) | (0, 0) => Direction::East,
            (-1, 0) => Direction::West,
            (1, -1) | (0, -1) => Direction::SouthEast,
            (-1, -1) => Direction::SouthWest,
            (-1, 1) | (0, 1) => Direction::NorthWest,
            (1, 1) => Direction::NorthEast,
            _ => Direction::East,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_stay_on_grid() {
        let p = Point::new(4, 2);
        assert!(p.is_on_grid());
        for n in p.neighbors() {
            assert!(n.is_on_grid(), "neighbor {} should be on the lattice", n);
        }
    }

    #[test]
    fn test_diagonal_neighbors_compose() {
        let p = Point::new(3, 5);
        assert_eq!(p.up_left().down_right(), p);
        assert_eq!(p.up_right().down_left(), p);
        assert_eq!(p.down_left().right(), p.down_right());
        assert_eq!(p.up_left().right(), p.up_right());
    }

    #[test]
    fn test_nearest_snaps_to_lattice() {
        assert_eq!(Point::nearest(2.1, 3.9), Point::new(2, 4));
        assert_eq!(Point::nearest(3.4, 4.1), Point::new(4, 4));
        assert_eq!(Point::nearest(2.6, 4.0), Point::new(2, 4));
        assert_eq!(Point::nearest(-0.2, 1.1), Point::new(-1, 1));
        assert!(Point::nearest(7.3, -2.2).is_on_grid());
    }

    #[test]
    fn test_direction_between() {
        let p = Point::new(4, 4);
        assert_eq!(Direction::between(p, p.right()), Direction::East);
        assert_eq!(Direction::between(p, p.left()), Direction::West);
        assert_eq!(Direction::between(p, p.down_right()), Direction::SouthEast);
        assert_eq!(Direction::between(p, p.down_left()), Direction::SouthWest);
        assert_eq!(Direction::between(p, p.up_left()), Direction::NorthWest);
        assert_eq!(Direction::between(p, p.up_right()), Direction::NorthEast);
    }
}
