// One game session: player operations and the per-tick state transition.
// All mutation is funneled through the owning session task, so nothing in
// here needs its own locking.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info};

use crate::domain::board::{self, ColorPalette, Difficulty};
use crate::domain::{Direction, GameSnapshot, GameState, Player};

pub const NO_WINNER: &str = "No Winner";

pub struct GameSession {
    pub id: String,
    pub tick_rate: u32,
    pub grid_size: i32,
    state: GameState,
    palette: ColorPalette,
    rng: StdRng,
    // Latched when food placement starves; the end-of-tick check must not
    // clear it.
    starved: bool,
}

impl GameSession {
    pub fn new(id: String, difficulty: Difficulty, tick_rate: u32, grid_size: i32) -> Self {
        let mut session = Self {
            id: id.clone(),
            tick_rate,
            grid_size,
            state: GameState::new(id, grid_size, difficulty),
            palette: ColorPalette::new(),
            rng: StdRng::from_entropy(),
            starved: false,
        };

        if difficulty.has_rocks() {
            session.state.rocks = board::generate_obstacles(&mut session.rng, grid_size);
        }
        session.spawn_food();
        session
    }

    pub fn start(&mut self) {
        self.state.is_started = true;
    }

    /// Advances the session by one tick and returns the snapshot to
    /// broadcast. The per-tick diff lists are cleared on the way out.
    pub fn tick(&mut self) -> GameSnapshot {
        let player_ids: Vec<String> = self.state.players.keys().cloned().collect();

        for player_id in player_ids {
            let head = {
                let Some(player) = self.state.players.get_mut(&player_id) else {
                    continue;
                };
                if player.pause || player.is_dead {
                    player.snake.toggle_idle_color();
                    continue;
                }
                player.snake.advance(self.grid_size, self.state.difficulty);
                player.snake.head()
            };

            if self.hits_obstacle(&player_id) {
                if let Some(player) = self.state.players.get_mut(&player_id) {
                    player.die();
                }
                self.state.add_died_player(player_id);
                continue;
            }

            if head == self.state.food.position {
                if let Some(player) = self.state.players.get_mut(&player_id) {
                    player.snake.grow();
                    player.set_score(player.snake.length());
                }
                // Relocate after growing so the new head cell is excluded.
                self.spawn_food();
                self.state.add_grown_player(player_id);
                continue;
            }

            if let Some(player) = self.state.players.get_mut(&player_id) {
                player.snake.step();
            }
        }

        self.check_game_end();

        let snapshot = self.state.snapshot();
        self.state.clear_tick_data();
        snapshot
    }

    /// Inserts a new player with a freshly drawn color. Silently rejected
    /// once the session has ended.
    pub fn join(&mut self, player_id: String, player_name: String) {
        if self.state.is_end {
            return;
        }
        let color = self.palette.draw(&mut self.rng);
        info!(game_id = %self.id, player_id = %player_id, "player joined");
        self.state.players.insert(
            player_id.clone(),
            Player::new(player_id, player_name, color),
        );
    }

    /// Applies a keyboard direction code. Unknown players, unknown codes,
    /// and non-perpendicular turns are all dropped.
    pub fn player_move(&mut self, player_id: &str, code: i32) {
        let Some(player) = self.state.players.get_mut(player_id) else {
            return;
        };
        let Some(requested) = Direction::from_code(code) else {
            return;
        };
        if requested.is_perpendicular_to(player.snake.direction) {
            let (dx, dy) = requested.vector();
            player.snake.set_direction(dx, dy);
        }
    }

    pub fn player_pause(&mut self, player_id: &str) {
        if let Some(player) = self.state.players.get_mut(player_id) {
            player.toggle_pause();
        }
    }

    pub fn player_respawn(&mut self, player_id: &str) {
        if let Some(player) = self.state.players.get_mut(player_id) {
            player.respawn();
        }
    }

    pub fn disconnect_player(&mut self, player_id: &str) {
        if let Some(player) = self.state.players.get_mut(player_id) {
            info!(game_id = %self.id, player_id = %player_id, "player disconnected");
            player.disconnect();
        }
    }

    /// Transfers an existing player to a new transport identity, preserving
    /// score, body, and color.
    pub fn reconnect_player(&mut self, prev_player_id: &str, player_id: String) {
        let Some(mut player) = self.state.players.remove(prev_player_id) else {
            return;
        };
        info!(
            game_id = %self.id,
            prev_player_id = %prev_player_id,
            player_id = %player_id,
            "player reconnected"
        );
        player.reconnect(player_id.clone());
        self.state.players.insert(player_id, player);
    }

    pub fn delete_player(&mut self, player_id: &str) {
        self.state.players.remove(player_id);
    }

    pub fn does_player_exist(&self, player_id: &str) -> bool {
        self.state.players.contains_key(player_id)
    }

    pub fn player_ids(&self) -> Vec<String> {
        self.state.players.keys().cloned().collect()
    }

    /// Relocates the food to a free cell. Placement starvation is the only
    /// unrecoverable condition in the session; it ends the game rather than
    /// looping forever on a packed board.
    fn spawn_food(&mut self) {
        match board::place_food(
            &mut self.rng,
            self.grid_size,
            self.state.difficulty,
            &self.state.rocks,
            self.state.players.values(),
        ) {
            Ok(position) => self.state.food.position = position,
            Err(err) => {
                error!(game_id = %self.id, %err, "food placement starved; ending session");
                self.starved = true;
                self.state.is_end = true;
                self.set_winner();
            }
        }
    }

    /// Fatal collision check for the already-advanced head, in fixed
    /// priority: wall, rock, own body, any enemy segment.
    fn hits_obstacle(&self, player_id: &str) -> bool {
        let Some(player) = self.state.players.get(player_id) else {
            return false;
        };
        let snake = &player.snake;
        let head = snake.head();

        let hits_wall = self.state.difficulty.walls_are_fatal() && !head.in_bounds(self.grid_size);
        if hits_wall {
            return true;
        }
        let hits_rock = self.state.difficulty.has_rocks()
            && self.state.rocks.iter().any(|rock| rock.position == head);
        if hits_rock {
            return true;
        }
        if snake.hits_self() {
            return true;
        }
        self.state
            .players
            .values()
            .filter(|enemy| enemy.id != player_id)
            .any(|enemy| enemy.snake.occupies(head))
    }

    /// The session ends once at least one player exists and all of them are
    /// dead, or once food placement has starved. An empty session never ends
    /// by itself.
    fn check_game_end(&mut self) {
        self.state.is_end = self.starved
            || (!self.state.players.is_empty()
                && self.state.players.values().all(|player| player.is_dead));
        if self.state.is_end {
            self.set_winner();
        }
    }

    /// Stable descending sort by score; first among equals wins. The
    /// tie-break order is whatever the player map iterates in.
    fn set_winner(&mut self) {
        let mut players: Vec<&Player> = self.state.players.values().collect();
        if players.is_empty() {
            self.state.winner_name = NO_WINNER.to_string();
            self.state.winner_score = 0;
            return;
        }
        if players.len() == 1 {
            self.state.winner_name = players[0].name.clone();
            self.state.winner_score = players[0].score;
            return;
        }
        players.sort_by(|a, b| b.score.cmp(&a.score));
        self.state.winner_name = players[0].name.clone();
        self.state.winner_score = players[0].score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinates;

    const GRID: i32 = 20;
    const TICKS_PER_SEC: u32 = 10;

    fn session(difficulty: Difficulty) -> GameSession {
        GameSession::new("g1".to_string(), difficulty, TICKS_PER_SEC, GRID)
    }

    fn park_food(session: &mut GameSession, x: i32, y: i32) {
        session.state.food.position = Coordinates::new(x, y);
    }

    #[test]
    fn single_player_advances_one_cell_per_tick() {
        // Scenario A: grid 20, easy tier, one player at the origin moving
        // right.
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);

        let snapshot = session.tick();
        let player = &snapshot.players["a"];
        assert_eq!(player.snake.head(), Coordinates::new(1, 0));
        assert_eq!(player.snake.body.len(), 1);
        assert!(!snapshot.is_end);
    }

    #[test]
    fn paused_player_does_not_move() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        session.player_pause("a");

        let snapshot = session.tick();
        assert_eq!(snapshot.players["a"].snake.head(), Coordinates::new(0, 0));
    }

    #[test]
    fn eating_food_grows_and_scores() {
        // Scenario C: head moves onto the food cell.
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 1, 0);

        let snapshot = session.tick();
        let player = &snapshot.players["a"];
        assert_eq!(player.snake.body.len(), 2);
        assert_eq!(player.score, 1);
        assert_eq!(snapshot.grown_now, vec!["a".to_string()]);
        // Food relocated off rocks and snake bodies.
        assert!(snapshot.food.position.in_bounds(GRID));
        assert!(!player.snake.occupies(snapshot.food.position));
    }

    #[test]
    fn diff_lists_are_empty_after_snapshot() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 1, 0);

        let snapshot = session.tick();
        assert_eq!(snapshot.grown_now.len(), 1);

        park_food(&mut session, 10, 10);
        let snapshot = session.tick();
        assert!(snapshot.grown_now.is_empty());
        assert!(snapshot.died_now.is_empty());
    }

    #[test]
    fn wrap_below_wall_tier_kill_at_wall_tier() {
        let mut easy = session(Difficulty::Easy);
        easy.join("a".to_string(), "Alice".to_string());
        park_food(&mut easy, 10, 10);
        easy.player_move("a", 38); // up from (0,0)
        let snapshot = easy.tick();
        assert_eq!(snapshot.players["a"].snake.head(), Coordinates::new(0, GRID - 1));
        assert!(snapshot.died_now.is_empty());

        let mut hard = session(Difficulty::Hard);
        hard.join("a".to_string(), "Alice".to_string());
        park_food(&mut hard, 10, 10);
        hard.player_move("a", 38);
        let snapshot = hard.tick();
        assert!(snapshot.players["a"].is_dead);
        assert_eq!(snapshot.died_now, vec!["a".to_string()]);
        assert!(snapshot.is_end);
    }

    #[test]
    fn rocks_only_kill_at_rock_tier() {
        let mut session = session(Difficulty::Hard);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        // A rock on the next head cell is inert below the rock tier.
        session.state.rocks = vec![crate::domain::Obstacle::new(Coordinates::new(1, 0))];

        let snapshot = session.tick();
        assert!(!snapshot.players["a"].is_dead);

        let mut nightmare = GameSession::new(
            "g2".to_string(),
            Difficulty::Nightmare,
            TICKS_PER_SEC,
            GRID,
        );
        nightmare.join("a".to_string(), "Alice".to_string());
        park_food(&mut nightmare, 10, 10);
        nightmare.state.rocks = vec![crate::domain::Obstacle::new(Coordinates::new(1, 0))];

        let snapshot = nightmare.tick();
        assert!(snapshot.players["a"].is_dead);
        assert_eq!(snapshot.died_now, vec!["a".to_string()]);
    }

    #[test]
    fn parallel_moves_are_ignored() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);

        // Reversal and same-direction requests change nothing.
        session.player_move("a", 37);
        session.player_move("a", 39);
        {
            let snake = &session.state.players["a"].snake;
            assert_eq!(snake.direction, Direction::Right);
        }

        // A perpendicular request turns immediately.
        session.player_move("a", 40);
        let snake = &session.state.players["a"].snake;
        assert_eq!(snake.direction, Direction::Down);
        assert_eq!((snake.dx, snake.dy), (0, 1));
    }

    #[test]
    fn malformed_codes_are_dropped() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        session.player_move("a", 1337);
        session.player_move("a", -5);
        let snake = &session.state.players["a"].snake;
        assert_eq!(snake.direction, Direction::Right);
    }

    #[test]
    fn enemy_collision_ends_two_player_session() {
        // Scenario B: both heads land on the other's body.
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        session.join("b".to_string(), "Bob".to_string());
        park_food(&mut session, 10, 10);

        // Face the snakes at each other one cell apart on the same row.
        {
            let a = session.state.players.get_mut("a").unwrap();
            a.snake.x = 4;
            a.snake.y = 5;
            a.snake.body = vec![Coordinates::new(4, 5)];
        }
        {
            let b = session.state.players.get_mut("b").unwrap();
            b.snake.x = 5;
            b.snake.y = 5;
            b.snake.set_direction(-1, 0);
            b.snake.body = vec![Coordinates::new(5, 5)];
        }

        // "a" moves onto (5,5) where "b" still stands; "b" moves onto (4,5)
        // where "a"'s body still lies (map order processes "a" first).
        let snapshot = session.tick();
        assert!(snapshot.players["a"].is_dead);
        assert!(snapshot.players["b"].is_dead);
        assert_eq!(
            snapshot.died_now,
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(snapshot.is_end);
    }

    #[test]
    fn empty_session_never_ends() {
        let mut session = session(Difficulty::Easy);
        park_food(&mut session, 10, 10);
        let snapshot = session.tick();
        assert!(!snapshot.is_end);
    }

    #[test]
    fn winner_is_highest_score_first_among_ties() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        session.join("b".to_string(), "Bob".to_string());
        session.join("c".to_string(), "Carol".to_string());
        park_food(&mut session, 10, 10);

        for (id, score) in [("a", 2), ("b", 5), ("c", 5)] {
            let player = session.state.players.get_mut(id).unwrap();
            player.set_score(score);
            player.die();
        }

        let snapshot = session.tick();
        assert!(snapshot.is_end);
        // Stable sort keeps "b" ahead of the equally scored "c".
        assert_eq!(snapshot.winner_name, "Bob");
        assert_eq!(snapshot.winner_score, 5);
    }

    #[test]
    fn lone_player_wins_with_its_exact_score() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        {
            let player = session.state.players.get_mut("a").unwrap();
            player.set_score(3);
            player.die();
        }

        let snapshot = session.tick();
        assert!(snapshot.is_end);
        assert_eq!(snapshot.winner_name, "Alice");
        assert_eq!(snapshot.winner_score, 3);
    }

    #[test]
    fn join_is_rejected_after_end() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        session.state.players.get_mut("a").unwrap().die();
        let snapshot = session.tick();
        assert!(snapshot.is_end);

        session.join("b".to_string(), "Bob".to_string());
        assert!(!session.does_player_exist("b"));
    }

    #[test]
    fn reconnect_preserves_score_and_body() {
        // Scenario D: "a" reconnects as "b".
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 1, 0);
        session.tick(); // eat: score 1, body length 2

        let before = session.state.players["a"].clone();
        session.disconnect_player("a");
        session.reconnect_player("a", "b".to_string());

        assert!(!session.does_player_exist("a"));
        let after = &session.state.players["b"];
        assert_eq!(after.score, before.score);
        assert_eq!(after.snake.body, before.snake.body);
        assert_eq!(after.snake.color, before.snake.color);
        assert!(!after.is_disconnected);
    }

    #[test]
    fn disconnected_player_stops_moving() {
        let mut session = session(Difficulty::Easy);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        session.disconnect_player("a");

        let snapshot = session.tick();
        assert_eq!(snapshot.players["a"].snake.head(), Coordinates::new(0, 0));
        assert!(snapshot.players["a"].is_disconnected);
    }

    #[test]
    fn respawn_resets_to_initial_configuration() {
        let mut session = session(Difficulty::Hard);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 10, 10);
        session.player_move("a", 38);
        session.tick(); // wall death
        assert!(session.state.players["a"].is_dead);

        session.player_respawn("a");
        let player = &session.state.players["a"];
        assert!(!player.is_dead);
        assert_eq!(player.score, 0);
        assert_eq!(player.snake.head(), Coordinates::new(0, 0));
        assert_eq!(player.snake.direction, Direction::Right);
    }

    #[test]
    fn food_starvation_during_tick_ends_session() {
        // On a 1x1 board the snake covers the whole grid after eating, so
        // relocating the food must starve and end the session even though
        // the player is still alive.
        let mut session = GameSession::new("g1".to_string(), Difficulty::Easy, TICKS_PER_SEC, 1);
        session.join("a".to_string(), "Alice".to_string());
        park_food(&mut session, 0, 0);

        let snapshot = session.tick();
        assert_eq!(snapshot.grown_now, vec!["a".to_string()]);
        assert!(!snapshot.players["a"].is_dead);
        assert!(snapshot.is_end);
        assert_eq!(snapshot.winner_name, "Alice");

        // The end is latched; later ticks cannot resurrect the session.
        let snapshot = session.tick();
        assert!(snapshot.is_end);
    }

    #[test]
    fn nightmare_sessions_spawn_rocks_once() {
        let session = session(Difficulty::Nightmare);
        assert_eq!(session.state.rocks.len(), board::OBSTACLE_COUNT);

        let easy = GameSession::new("g3".to_string(), Difficulty::Easy, TICKS_PER_SEC, GRID);
        assert!(easy.state.rocks.is_empty());
    }

    #[test]
    fn distinct_players_get_distinct_palette_colors() {
        let mut session = session(Difficulty::Easy);
        for i in 0..5 {
            session.join(format!("p{i}"), format!("P{i}"));
        }
        let colors: std::collections::HashSet<String> = session
            .state
            .players
            .values()
            .map(|player| player.snake.color.clone())
            .collect();
        assert_eq!(colors.len(), 5);

        // Sixth join drains past the palette and falls back.
        session.join("p5".to_string(), "P5".to_string());
        assert_eq!(
            session.state.players["p5"].snake.color,
            board::FALLBACK_COLOR
        );
    }

    #[test]
    fn unknown_player_operations_are_no_ops() {
        let mut session = session(Difficulty::Easy);
        session.player_move("ghost", 38);
        session.player_pause("ghost");
        session.player_respawn("ghost");
        session.disconnect_player("ghost");
        session.reconnect_player("ghost", "other".to_string());
        session.delete_player("ghost");
        assert!(session.player_ids().is_empty());
    }
}
