// Player identity, score, and the lifecycle state machine.

use crate::domain::snake::Snake;

/// One connected participant of a session. The id is transport-assigned and
/// replaced wholesale on reconnect.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub snake: Snake,
    pub score: i32,
    pub pause: bool,
    pub is_dead: bool,
    pub is_disconnected: bool,
}

impl Player {
    pub fn new(id: String, name: String, color: String) -> Self {
        Self {
            id,
            name,
            snake: Snake::new(color),
            score: 0,
            pause: false,
            is_dead: false,
            is_disconnected: false,
        }
    }

    /// Fatal collision; terminal until an explicit respawn.
    pub fn die(&mut self) {
        self.is_dead = true;
    }

    /// Back from the dead with a fresh snake and a zeroed score.
    pub fn respawn(&mut self) {
        self.is_dead = false;
        self.score = 0;
        self.snake.respawn();
    }

    pub fn set_score(&mut self, score: i32) {
        self.score = score;
    }

    /// Pause toggle; resuming restores the snake's assigned color after the
    /// idle blink.
    pub fn toggle_pause(&mut self) {
        self.pause = !self.pause;
        if !self.pause {
            self.snake.reset_color();
        }
    }

    /// Marks the player gone and forces a pause so the tick loop stops
    /// moving the snake. Deletion is decided elsewhere.
    pub fn disconnect(&mut self) {
        self.is_disconnected = true;
        self.pause = true;
    }

    /// Rebinds the player to a new transport identity, keeping snake, score,
    /// and color intact.
    pub fn reconnect(&mut self, new_id: String) {
        self.id = new_id;
        self.is_disconnected = false;
        self.pause = false;
        self.snake.reset_color();
    }
}
