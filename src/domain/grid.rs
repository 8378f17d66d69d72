// Grid primitives shared by the whole simulation.

use serde::{Deserialize, Serialize};

/// Cell position on the square board. Signed so a head that just crossed the
/// boundary can be inspected by the wall check before it is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the position lies inside `[0, grid_size)` on both axes.
    pub fn in_bounds(&self, grid_size: i32) -> bool {
        self.x >= 0 && self.x < grid_size && self.y >= 0 && self.y < grid_size
    }
}

/// Historical keyboard arrow codes carried by move messages.
const CODE_LEFT: i32 = 37;
const CODE_UP: i32 = 38;
const CODE_RIGHT: i32 = 39;
const CODE_DOWN: i32 = 40;

/// Cardinal heading of a snake. The y axis grows downward, so `Up` moves
/// toward smaller y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    /// Unit movement vector (dx, dy) for this heading.
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    /// Derives the heading from a unit movement vector. Move inputs only
    /// ever produce unit vectors, so anything else is rejected.
    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (1, 0) => Some(Direction::Right),
            (-1, 0) => Some(Direction::Left),
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            _ => None,
        }
    }

    /// Maps a keyboard arrow code to a heading; anything else is invalid
    /// input and ignored by the caller.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            CODE_LEFT => Some(Direction::Left),
            CODE_UP => Some(Direction::Up),
            CODE_RIGHT => Some(Direction::Right),
            CODE_DOWN => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// A turn is legal only onto the other axis; reversing onto yourself is
    /// not a move.
    pub fn is_perpendicular_to(self, other: Direction) -> bool {
        self.is_horizontal() != other.is_horizontal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_codes_map_to_headings() {
        assert_eq!(Direction::from_code(37), Some(Direction::Left));
        assert_eq!(Direction::from_code(38), Some(Direction::Up));
        assert_eq!(Direction::from_code(39), Some(Direction::Right));
        assert_eq!(Direction::from_code(40), Some(Direction::Down));
        assert_eq!(Direction::from_code(13), None);
        assert_eq!(Direction::from_code(-1), None);
    }

    #[test]
    fn vectors_round_trip() {
        for dir in [
            Direction::Right,
            Direction::Left,
            Direction::Up,
            Direction::Down,
        ] {
            let (dx, dy) = dir.vector();
            assert_eq!(Direction::from_vector(dx, dy), Some(dir));
        }
    }

    #[test]
    fn perpendicularity_rejects_same_axis() {
        assert!(Direction::Up.is_perpendicular_to(Direction::Left));
        assert!(Direction::Right.is_perpendicular_to(Direction::Down));
        assert!(!Direction::Left.is_perpendicular_to(Direction::Right));
        assert!(!Direction::Up.is_perpendicular_to(Direction::Down));
        assert!(!Direction::Up.is_perpendicular_to(Direction::Up));
    }

    #[test]
    fn bounds_check() {
        let grid = 20;
        assert!(Coordinates::new(0, 0).in_bounds(grid));
        assert!(Coordinates::new(19, 19).in_bounds(grid));
        assert!(!Coordinates::new(-1, 5).in_bounds(grid));
        assert!(!Coordinates::new(5, 20).in_bounds(grid));
    }
}
