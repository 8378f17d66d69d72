// Thread-safe registry mapping game id to active session handles.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

use crate::domain::{Difficulty, GameSnapshot};
use crate::use_cases::game::session_task;
use crate::use_cases::session::GameSession;
use crate::use_cases::types::{SessionEvent, SessionHandle, SessionSettings};

/// Errors returned by registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Session already exists and cannot be re-created.
    AlreadyExists,
}

/// Owns the set of active session tasks. This is the only structure touched
/// by multiple connections concurrently; each session's state stays behind
/// its own task.
pub struct SessionRegistry {
    /// Global settings applied to newly created sessions.
    settings: SessionSettings,
    /// Map of game id to active handle.
    sessions: RwLock<HashMap<String, SessionHandle>>,
    /// Broadcasts the full id list whenever a session is created or removed.
    list_tx: broadcast::Sender<Vec<String>>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        let (list_tx, _list_rx) = broadcast::channel(16);
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
            list_tx,
        }
    }

    /// Creates a new session and spawns its task.
    pub async fn create_session(
        self: &Arc<Self>,
        game_id: String,
        difficulty: Difficulty,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&game_id) {
            return Err(SessionError::AlreadyExists);
        }

        // Channel wiring for the session loop.
        let (input_tx, input_rx) =
            mpsc::channel::<SessionEvent>(self.settings.input_channel_capacity);
        let (snapshot_tx, _snapshot_rx) =
            broadcast::channel::<GameSnapshot>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_bytes_tx, _snapshot_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_latest_tx, _snapshot_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let shutdown = Arc::new(Notify::new());

        let session = GameSession::new(
            game_id.clone(),
            difficulty,
            self.settings.tick_rate,
            self.settings.grid_size,
        );

        // Spawn the authoritative loop for this session.
        tokio::spawn(session_task(
            session,
            input_rx,
            snapshot_tx.clone(),
            self.settings.tick_interval(),
            shutdown.clone(),
            self.clone(),
        ));

        let handle = SessionHandle {
            game_id: Arc::from(game_id.clone()),
            input_tx,
            snapshot_tx,
            snapshot_bytes_tx,
            snapshot_latest_tx,
            shutdown,
        };

        sessions.insert(game_id.clone(), handle.clone());
        info!(%game_id, difficulty = difficulty.as_u8(), "session created");

        self.broadcast_list(&sessions);
        Ok(handle)
    }

    /// Returns a session handle for the provided id, if it exists.
    pub async fn get_session(&self, game_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(game_id).cloned()
    }

    /// Removes a session and stops its task. Safe to call for ids that are
    /// already gone, so an ended session and an external delete cannot
    /// double-remove.
    pub async fn remove_session(&self, game_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.remove(game_id) {
            handle.shutdown.notify_one();
            info!(%game_id, "session removed");
            self.broadcast_list(&sessions);
        }
    }

    /// Current game ids, for listing updates sent to clients.
    pub async fn game_ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }

    /// Subscribes to registry listing changes.
    pub fn subscribe_list(&self) -> broadcast::Receiver<Vec<String>> {
        self.list_tx.subscribe()
    }

    fn broadcast_list(&self, sessions: &HashMap<String, SessionHandle>) {
        let _ = self.list_tx.send(sessions.keys().cloned().collect());
    }
}
