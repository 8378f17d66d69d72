// The per-session fixed-step loop: drain player actions, advance the
// simulation, broadcast the snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info};

use crate::domain::GameSnapshot;
use crate::use_cases::registry::SessionRegistry;
use crate::use_cases::session::GameSession;
use crate::use_cases::types::SessionEvent;

/// Owns one `GameSession` for its whole lifetime. Player actions and ticks
/// are interleaved on this single task, so the mutation surface is
/// serialized by construction.
///
/// When a tick reports the session has ended, the terminal snapshot is
/// broadcast, the session is removed from the registry, and the loop exits.
/// Each of those happens exactly once because the loop breaks immediately
/// after.
pub async fn session_task(
    mut session: GameSession,
    mut input_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: broadcast::Sender<GameSnapshot>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
    registry: Arc<SessionRegistry>,
) {
    let game_id = session.id.clone();
    session.start();
    info!(%game_id, tick_rate = session.tick_rate, "session started");

    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the session is removed externally.
                debug!(%game_id, "session shutdown requested");
                break;
            }
            _ = interval.tick() => {}
        }

        // Apply every action that arrived since the previous tick before
        // advancing the simulation.
        while let Ok(event) = input_rx.try_recv() {
            apply_event(&mut session, event);
        }

        let snapshot = session.tick();
        let ended = snapshot.is_end;

        // Send failures just mean nobody is subscribed right now.
        let _ = snapshot_tx.send(snapshot);

        if ended {
            info!(%game_id, "session ended");
            registry.remove_session(&game_id).await;
            break;
        }
    }
}

fn apply_event(session: &mut GameSession, event: SessionEvent) {
    match event {
        SessionEvent::Join {
            player_id,
            player_name,
            prev_player_id,
        } => match prev_player_id {
            Some(prev) if session.does_player_exist(&prev) => {
                session.reconnect_player(&prev, player_id);
            }
            _ => session.join(player_id, player_name),
        },
        SessionEvent::Move {
            player_id,
            direction_code,
        } => session.player_move(&player_id, direction_code),
        SessionEvent::Pause { player_id } => session.player_pause(&player_id),
        SessionEvent::Respawn { player_id } => session.player_respawn(&player_id),
        SessionEvent::Disconnect { player_id } => session.disconnect_player(&player_id),
        SessionEvent::Delete { player_id } => session.delete_player(&player_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn session() -> GameSession {
        GameSession::new("g1".to_string(), Difficulty::Easy, 10, 20)
    }

    #[test]
    fn join_event_creates_player() {
        let mut s = session();
        apply_event(
            &mut s,
            SessionEvent::Join {
                player_id: "a".to_string(),
                player_name: "Alice".to_string(),
                prev_player_id: None,
            },
        );
        assert!(s.does_player_exist("a"));
    }

    #[test]
    fn join_with_known_prev_id_reconnects() {
        let mut s = session();
        s.join("a".to_string(), "Alice".to_string());
        s.disconnect_player("a");

        apply_event(
            &mut s,
            SessionEvent::Join {
                player_id: "b".to_string(),
                player_name: "Alice".to_string(),
                prev_player_id: Some("a".to_string()),
            },
        );
        assert!(!s.does_player_exist("a"));
        assert!(s.does_player_exist("b"));
    }

    #[test]
    fn join_with_unknown_prev_id_is_a_fresh_join() {
        let mut s = session();
        apply_event(
            &mut s,
            SessionEvent::Join {
                player_id: "b".to_string(),
                player_name: "Bob".to_string(),
                prev_player_id: Some("ghost".to_string()),
            },
        );
        assert!(s.does_player_exist("b"));
    }

    #[test]
    fn delete_event_removes_player() {
        let mut s = session();
        s.join("a".to_string(), "Alice".to_string());
        apply_event(
            &mut s,
            SessionEvent::Delete {
                player_id: "a".to_string(),
            },
        );
        assert!(!s.does_player_exist("a"));
    }
}
