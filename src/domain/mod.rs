// Domain layer: core simulation types and rules.

pub mod board;
pub mod grid;
pub mod player;
pub mod snake;
pub mod state;

pub use board::{ColorPalette, Difficulty, Food, Obstacle, PlacementExhausted};
pub use grid::{Coordinates, Direction};
pub use player::Player;
pub use snake::Snake;
pub use state::{GameSnapshot, GameState};
