// Snake geometry: head position, movement vector, and the body trail.

use crate::domain::grid::{Coordinates, Direction};

use super::Difficulty;

/// Color a paused or dead snake blinks to so clients can show status.
const IDLE_COLOR: &str = "#555555";

/// One player's snake. The body is ordered head-first: `body[0]` is always
/// the current head, the last element the tail tip.
#[derive(Debug, Clone)]
pub struct Snake {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
    pub direction: Direction,
    pub body: Vec<Coordinates>,
    pub color: String,
    base_color: String,
}

impl Snake {
    /// Spawns at the origin moving right with a single-segment body.
    pub fn new(color: String) -> Self {
        Self {
            x: 0,
            y: 0,
            dx: 1,
            dy: 0,
            direction: Direction::Right,
            body: vec![Coordinates::new(0, 0)],
            color: color.clone(),
            base_color: color,
        }
    }

    /// Sets the movement vector and keeps the derived heading in sync.
    pub fn set_direction(&mut self, dx: i32, dy: i32) {
        self.dx = dx;
        self.dy = dy;
        if let Some(direction) = Direction::from_vector(dx, dy) {
            self.direction = direction;
        }
    }

    /// Advances the head one cell. Below the wall tier the board is a torus
    /// and the head wraps; at or above it the head is left out of bounds for
    /// the collision check to judge.
    pub fn advance(&mut self, grid_size: i32, difficulty: Difficulty) {
        self.x += self.dx;
        self.y += self.dy;
        if !difficulty.walls_are_fatal() {
            self.x = self.x.rem_euclid(grid_size);
            self.y = self.y.rem_euclid(grid_size);
        }
    }

    /// Grows by one segment: the new head is prepended, the tail stays.
    pub fn grow(&mut self) {
        self.body.insert(0, Coordinates::new(self.x, self.y));
    }

    /// Normal forward step: prepend the new head, drop the tail tip.
    pub fn step(&mut self) {
        self.body.insert(0, Coordinates::new(self.x, self.y));
        self.body.pop();
    }

    /// Segments eaten since spawn; doubles as the player score.
    pub fn length(&self) -> i32 {
        self.body.len() as i32 - 1
    }

    pub fn head(&self) -> Coordinates {
        Coordinates::new(self.x, self.y)
    }

    /// True when the head overlaps any non-head segment of this snake.
    pub fn hits_self(&self) -> bool {
        self.body
            .iter()
            .skip(1)
            .any(|part| part.x == self.x && part.y == self.y)
    }

    /// True when `point` lies on any segment of this snake, head included.
    pub fn occupies(&self, point: Coordinates) -> bool {
        self.body.iter().any(|part| *part == point)
    }

    /// Cosmetic blink applied while the owner is paused or dead.
    pub fn toggle_idle_color(&mut self) {
        if self.color == IDLE_COLOR {
            self.color = self.base_color.clone();
        } else {
            self.color = IDLE_COLOR.to_string();
        }
    }

    /// Restores the assigned color after a pause ends.
    pub fn reset_color(&mut self) {
        self.color = self.base_color.clone();
    }

    /// Back to the initial configuration, keeping the assigned color.
    pub fn respawn(&mut self) {
        self.x = 0;
        self.y = 0;
        self.dx = 1;
        self.dy = 0;
        self.direction = Direction::Right;
        self.body = vec![Coordinates::new(0, 0)];
        self.color = self.base_color.clone();
    }
}
