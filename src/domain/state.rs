// Canonical mutable session state and the owned snapshot handed to the
// transport layer.

use std::collections::BTreeMap;

use crate::domain::board::{Difficulty, Food, Obstacle};
use crate::domain::player::Player;

/// Mutable source of truth for one session. Only the owning session task
/// ever touches this.
///
/// Player iteration order is the key order of the `BTreeMap`; the winner
/// tie-break inherits it through the stable sort in the session logic.
#[derive(Debug)]
pub struct GameState {
    pub id: String,
    pub grid_size: i32,
    pub difficulty: Difficulty,
    pub players: BTreeMap<String, Player>,
    pub food: Food,
    pub rocks: Vec<Obstacle>,
    pub is_end: bool,
    pub is_started: bool,
    pub winner_name: String,
    pub winner_score: i32,
    // Transient per-tick diffs; empty outside a tick.
    died_now: Vec<String>,
    grown_now: Vec<String>,
}

impl GameState {
    pub fn new(id: String, grid_size: i32, difficulty: Difficulty) -> Self {
        Self {
            id,
            grid_size,
            difficulty,
            players: BTreeMap::new(),
            food: Food::new(),
            rocks: Vec::new(),
            is_end: false,
            is_started: false,
            winner_name: String::new(),
            winner_score: 0,
            died_now: Vec::new(),
            grown_now: Vec::new(),
        }
    }

    pub fn add_died_player(&mut self, player_id: String) {
        self.died_now.push(player_id);
    }

    pub fn add_grown_player(&mut self, player_id: String) {
        self.grown_now.push(player_id);
    }

    /// Produces an owned snapshot. Everything is copied so the transport can
    /// hold it across ticks without aliasing state that the next tick will
    /// mutate; the diff lists in particular are cleared right after this.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            grid_size: self.grid_size,
            difficulty: self.difficulty,
            players: self.players.clone(),
            food: self.food.clone(),
            rocks: self.rocks.clone(),
            is_end: self.is_end,
            is_started: self.is_started,
            winner_name: self.winner_name.clone(),
            winner_score: self.winner_score,
            died_now: self.died_now.clone(),
            grown_now: self.grown_now.clone(),
        }
    }

    /// Drops this tick's diffs once they have been snapshotted.
    pub fn clear_tick_data(&mut self) {
        self.died_now.clear();
        self.grown_now.clear();
    }

    #[cfg(test)]
    pub fn died_now(&self) -> &[String] {
        &self.died_now
    }

    #[cfg(test)]
    pub fn grown_now(&self) -> &[String] {
        &self.grown_now
    }
}

/// Immutable copy of a session's state emitted once per tick.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub id: String,
    pub grid_size: i32,
    pub difficulty: Difficulty,
    pub players: BTreeMap<String, Player>,
    pub food: Food,
    pub rocks: Vec<Obstacle>,
    pub is_end: bool,
    pub is_started: bool,
    pub winner_name: String,
    pub winner_score: i32,
    pub died_now: Vec<String>,
    pub grown_now: Vec<String>,
}
