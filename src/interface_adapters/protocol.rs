// Wire protocol DTOs and conversions for public snake server messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, Direction, Food, GameSnapshot, Obstacle, Player, Snake};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Current session ids; sent on connect and on every registry change.
    GameList { game_ids: Vec<String> },
    // Confirmation that a CreateGame request produced a session.
    GameCreated { game_id: String },
    // Confirmation that a JoinGame request was forwarded to the session.
    GameJoined { game_id: String, player_id: String },
    // Echo of a pause request so the client can update its UI.
    PlayerPaused { player_id: String },
    // Snapshot of a session for one tick.
    GameTick(GameSnapshotDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    CreateGame(CreateGamePayload),
    JoinGame(JoinGamePayload),
    GameTurn(GameTurnPayload),
    Pause(PlayerTargetPayload),
    Respawn(PlayerTargetPayload),
    Leave(PlayerTargetPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGamePayload {
    #[serde(default)]
    pub difficulty: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinGamePayload {
    pub game_id: String,
    pub player_id: String,
    pub player_name: String,
    /// Present when resuming a previous identity after a reconnect.
    #[serde(default)]
    pub prev_player_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameTurnPayload {
    pub game_id: String,
    pub player_id: String,
    /// Historical keyboard code. Clients have sent this as both a number
    /// and a string, so it is parsed leniently and dropped when invalid.
    pub direction_code: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerTargetPayload {
    pub game_id: String,
    pub player_id: String,
}

/// Extracts the integer direction code, accepting numeric or string JSON
/// values. Anything else is invalid input for the caller to log and drop.
pub fn parse_direction_code(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Snapshot of a session sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshotDto {
    pub id: String,
    pub grid_size: i32,
    pub difficulty: u8,
    pub players: BTreeMap<String, PlayerDto>,
    pub food: FoodDto,
    pub rocks: Vec<ObstacleDto>,
    pub is_end: bool,
    pub is_started: bool,
    pub winner_name: String,
    pub winner_score: i32,
    pub died_now: Vec<String>,
    pub grown_now: Vec<String>,
}

impl From<GameSnapshot> for GameSnapshotDto {
    fn from(snapshot: GameSnapshot) -> Self {
        Self {
            id: snapshot.id,
            grid_size: snapshot.grid_size,
            difficulty: snapshot.difficulty.as_u8(),
            players: snapshot
                .players
                .iter()
                .map(|(id, player)| (id.clone(), PlayerDto::from(player)))
                .collect(),
            food: FoodDto::from(&snapshot.food),
            rocks: snapshot.rocks.iter().map(ObstacleDto::from).collect(),
            is_end: snapshot.is_end,
            is_started: snapshot.is_started,
            winner_name: snapshot.winner_name,
            winner_score: snapshot.winner_score,
            died_now: snapshot.died_now,
            grown_now: snapshot.grown_now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub name: String,
    pub score: i32,
    pub pause: bool,
    pub is_dead: bool,
    pub is_disconnected: bool,
    pub snake: SnakeDto,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            score: player.score,
            pause: player.pause,
            is_dead: player.is_dead,
            is_disconnected: player.is_disconnected,
            snake: SnakeDto::from(&player.snake),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnakeDto {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub body: Vec<Coordinates>,
    pub color: String,
}

impl From<&Snake> for SnakeDto {
    fn from(snake: &Snake) -> Self {
        Self {
            x: snake.x,
            y: snake.y,
            direction: snake.direction,
            body: snake.body.clone(),
            color: snake.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodDto {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

impl From<&Food> for FoodDto {
    fn from(food: &Food) -> Self {
        Self {
            x: food.position.x,
            y: food.position.y,
            color: food.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleDto {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

impl From<&Obstacle> for ObstacleDto {
    fn from(obstacle: &Obstacle) -> Self {
        Self {
            x: obstacle.position.x,
            y: obstacle.position.y,
            color: obstacle.color.clone(),
        }
    }
}
