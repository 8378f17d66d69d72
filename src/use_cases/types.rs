// Use-case level inputs/outputs for the session loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{Notify, broadcast, mpsc, watch};

use crate::domain::GameSnapshot;

/// Player actions delivered by the transport layer into a session task.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Join {
        player_id: String,
        player_name: String,
        /// Present when the client is resuming a previous identity.
        prev_player_id: Option<String>,
    },
    Move {
        player_id: String,
        direction_code: i32,
    },
    Pause {
        player_id: String,
    },
    Respawn {
        player_id: String,
    },
    Disconnect {
        player_id: String,
    },
    Delete {
        player_id: String,
    },
}

/// Shared configuration for spawning session tasks.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound player action events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast snapshots.
    pub snapshot_broadcast_capacity: usize,
    /// Ticks per second for every session's fixed-step loop.
    pub tick_rate: u32,
    /// Side length of the square board.
    pub grid_size: i32,
}

impl SessionSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.tick_rate.max(1)))
    }
}

/// Per-session channels handed to the transport layer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Identifier clients use to target this session.
    pub game_id: Arc<str>,
    /// Sender for player actions into the session task.
    pub input_tx: mpsc::Sender<SessionEvent>,
    /// Broadcast sender for raw snapshots.
    pub snapshot_tx: broadcast::Sender<GameSnapshot>,
    /// Broadcast sender for serialized snapshots.
    pub snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized snapshot.
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
    /// Signal that stops the session task.
    pub shutdown: Arc<Notify>,
}
