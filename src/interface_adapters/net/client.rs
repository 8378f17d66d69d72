use crate::domain::Difficulty;
use crate::interface_adapters::protocol::{
    ClientMessage, GameSnapshotDto, ServerMessage, parse_direction_code,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids;
use crate::use_cases::{SessionEvent, SessionHandle, SessionRegistry};

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code},
    },
    response::IntoResponse,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
const CREATE_ID_ATTEMPTS: usize = 4;

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

enum LoopControl {
    Continue,
    Disconnect,
}

/// Serializes each session snapshot once and broadcasts the shared bytes.
pub async fn snapshot_serializer(
    mut snapshot_rx: broadcast::Receiver<crate::domain::GameSnapshot>,
    snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match snapshot_rx.recv().await {
            Ok(snapshot) => {
                let msg = ServerMessage::GameTick(GameSnapshotDto::from(snapshot));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize snapshot");
                        continue;
                    }
                };

                // Convert once and share the UTF-8 bytes across all clients.
                let bytes = Utf8Bytes::from(txt);
                // Keep the latest bytes around for lag recovery.
                let _ = snapshot_latest_tx.send(bytes.clone());
                let _ = snapshot_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "snapshot serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                // Session task exited; nothing further to serialize.
                break;
            }
        }
    }
}

/// Spawns the serializer task for a freshly created session.
pub fn spawn_session_serializer(handle: &SessionHandle) {
    tokio::spawn(snapshot_serializer(
        handle.snapshot_tx.subscribe(),
        handle.snapshot_bytes_tx.clone(),
        handle.snapshot_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

struct ConnCtx {
    registry: Arc<SessionRegistry>,
    // game id -> player id this connection joined with.
    joined: HashMap<String, String>,
    // game id -> snapshot forwarder feeding the outbound channel.
    forwarders: HashMap<String, JoinHandle<()>>,
    outbound_tx: mpsc::Sender<Utf8Bytes>,
    invalid_json: u32,
    last_invalid_log: Instant,
    close_frame: Option<CloseFrame>,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Connection id correlates logs across the whole socket lifetime.
    let conn_id = ids::conn_id();
    let span = info_span!("conn", conn_id);
    run_connection(socket, state).instrument(span).await;
}

async fn run_connection(mut socket: WebSocket, state: Arc<AppState>) {
    info!("client connected");

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Utf8Bytes>(OUTBOUND_CHANNEL_CAPACITY);
    let mut list_rx = state.session_registry.subscribe_list();

    // Greet with the current session list, matching what clients poll for.
    let game_ids = state.session_registry.game_ids().await;
    if send_message(&mut socket, &ServerMessage::GameList { game_ids })
        .await
        .is_err()
    {
        return;
    }

    let mut ctx = ConnCtx {
        registry: state.session_registry.clone(),
        joined: HashMap::new(),
        forwarders: HashMap::new(),
        outbound_tx,
        invalid_json: 0,
        last_invalid_log: Instant::now() - LOG_THROTTLE,
        close_frame: None,
    };

    loop {
        let disconnect = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(&mut socket, incoming, &mut ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        warn!(error = ?e, "client loop error");
                        true
                    }
                }
            }

            // Snapshot bytes forwarded from joined sessions.
            bytes = outbound_rx.recv() => {
                match bytes {
                    Some(bytes) => socket.send(Message::Text(bytes)).await.is_err(),
                    // Unreachable while ctx holds a sender; treat as closed.
                    None => true,
                }
            }

            // Registry listing changes fan out to every connection.
            list = list_rx.recv() => {
                match list {
                    Ok(game_ids) => {
                        send_message(&mut socket, &ServerMessage::GameList { game_ids })
                            .await
                            .is_err()
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed intermediate lists; the current one suffices.
                        let game_ids = ctx.registry.game_ids().await;
                        send_message(&mut socket, &ServerMessage::GameList { game_ids })
                            .await
                            .is_err()
                    }
                    Err(broadcast::error::RecvError::Closed) => true,
                }
            }
        };

        if disconnect {
            // Sending the close frame is enough; dropping the socket
            // finishes the shutdown.
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            break;
        }
    }

    disconnect_cleanup(ctx).await;
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => handle_client_message(socket, ctx, msg).await,
            Err(parse_err) => {
                ctx.invalid_json += 1;
                if should_log(&mut ctx.last_invalid_log) {
                    warn!(
                        bytes = text.len(),
                        error = %parse_err,
                        "failed to parse client message"
                    );
                }
                if ctx.invalid_json > MAX_INVALID_JSON {
                    ctx.close_frame = Some(CloseFrame {
                        code: close_code::POLICY,
                        reason: "too many invalid messages".into(),
                    });
                    return Ok(LoopControl::Disconnect);
                }
                Ok(LoopControl::Continue)
            }
        },
        Some(Ok(Message::Binary(_))) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            Ok(LoopControl::Disconnect)
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Ok(LoopControl::Continue),
        Some(Ok(Message::Close(_))) => Ok(LoopControl::Disconnect),
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn handle_client_message(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    msg: ClientMessage,
) -> Result<LoopControl, NetError> {
    match msg {
        ClientMessage::CreateGame(payload) => {
            let Some(difficulty) = Difficulty::from_u8(payload.difficulty) else {
                warn!(difficulty = payload.difficulty, "invalid difficulty; ignoring");
                return Ok(LoopControl::Continue);
            };

            // Random ids can collide; retry a few times before giving up.
            for _ in 0..CREATE_ID_ATTEMPTS {
                let game_id = ids::new_game_id();
                match ctx.registry.create_session(game_id.clone(), difficulty).await {
                    Ok(handle) => {
                        spawn_session_serializer(&handle);
                        send_message(socket, &ServerMessage::GameCreated { game_id }).await?;
                        return Ok(LoopControl::Continue);
                    }
                    Err(crate::use_cases::SessionError::AlreadyExists) => continue,
                }
            }
            warn!("could not allocate a fresh game id");
            Ok(LoopControl::Continue)
        }

        ClientMessage::JoinGame(payload) => {
            let Some(handle) = ctx.registry.get_session(&payload.game_id).await else {
                // Unknown session ids are silent no-ops by design.
                debug!(game_id = %payload.game_id, "join for unknown game ignored");
                return Ok(LoopControl::Continue);
            };

            let event = SessionEvent::Join {
                player_id: payload.player_id.clone(),
                player_name: payload.player_name,
                prev_player_id: payload.prev_player_id,
            };
            if handle.input_tx.send(event).await.is_err() {
                debug!(game_id = %payload.game_id, "session gone before join");
                return Ok(LoopControl::Continue);
            }

            ctx.joined
                .insert(payload.game_id.clone(), payload.player_id.clone());
            ctx.forwarders
                .entry(payload.game_id.clone())
                .or_insert_with(|| spawn_snapshot_forwarder(&handle, ctx.outbound_tx.clone()));

            send_message(
                socket,
                &ServerMessage::GameJoined {
                    game_id: payload.game_id,
                    player_id: payload.player_id,
                },
            )
            .await?;
            Ok(LoopControl::Continue)
        }

        ClientMessage::GameTurn(payload) => {
            let Some(code) = parse_direction_code(&payload.direction_code) else {
                // Malformed codes are logged and dropped, never an error.
                if should_log(&mut ctx.last_invalid_log) {
                    warn!(
                        game_id = %payload.game_id,
                        player_id = %payload.player_id,
                        code = %payload.direction_code,
                        "malformed direction code; dropping"
                    );
                }
                return Ok(LoopControl::Continue);
            };
            forward_event(
                ctx,
                &payload.game_id,
                SessionEvent::Move {
                    player_id: payload.player_id,
                    direction_code: code,
                },
            )
            .await;
            Ok(LoopControl::Continue)
        }

        ClientMessage::Pause(payload) => {
            forward_event(
                ctx,
                &payload.game_id,
                SessionEvent::Pause {
                    player_id: payload.player_id.clone(),
                },
            )
            .await;
            send_message(
                socket,
                &ServerMessage::PlayerPaused {
                    player_id: payload.player_id,
                },
            )
            .await?;
            Ok(LoopControl::Continue)
        }

        ClientMessage::Respawn(payload) => {
            forward_event(
                ctx,
                &payload.game_id,
                SessionEvent::Respawn {
                    player_id: payload.player_id,
                },
            )
            .await;
            Ok(LoopControl::Continue)
        }

        ClientMessage::Leave(payload) => {
            forward_event(
                ctx,
                &payload.game_id,
                SessionEvent::Delete {
                    player_id: payload.player_id,
                },
            )
            .await;
            ctx.joined.remove(&payload.game_id);
            if let Some(task) = ctx.forwarders.remove(&payload.game_id) {
                task.abort();
            }
            Ok(LoopControl::Continue)
        }
    }
}

/// Sends an event to a session, treating unknown or closed sessions as
/// silent no-ops.
async fn forward_event(ctx: &ConnCtx, game_id: &str, event: SessionEvent) {
    let Some(handle) = ctx.registry.get_session(game_id).await else {
        debug!(%game_id, "event for unknown game ignored");
        return;
    };
    if handle.input_tx.send(event).await.is_err() {
        debug!(%game_id, "session gone; event dropped");
    }
}

/// Pipes one session's serialized snapshots into the connection's outbound
/// channel, recovering from lag with the latest snapshot.
fn spawn_snapshot_forwarder(
    handle: &SessionHandle,
    outbound_tx: mpsc::Sender<Utf8Bytes>,
) -> JoinHandle<()> {
    let game_id = handle.game_id.clone();
    let mut bytes_rx = handle.snapshot_bytes_tx.subscribe();
    let latest_rx = handle.snapshot_latest_tx.subscribe();
    tokio::spawn(async move {
        loop {
            match bytes_rx.recv().await {
                Ok(bytes) => {
                    if outbound_tx.send(bytes).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(%game_id, missed = n, "snapshots lagged; sending latest");
                    let latest = latest_rx.borrow().clone();
                    if !latest.is_empty() && outbound_tx.send(latest).await.is_err() {
                        break;
                    }
                }
                // Session ended; the terminal snapshot was already queued.
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Socket closed: every session this connection joined gets a disconnect so
/// the player pauses in place and can be resumed by a reconnect.
async fn disconnect_cleanup(ctx: ConnCtx) {
    for (game_id, player_id) in &ctx.joined {
        if let Some(handle) = ctx.registry.get_session(game_id).await {
            let _ = handle
                .input_tx
                .send(SessionEvent::Disconnect {
                    player_id: player_id.clone(),
                })
                .await;
        }
    }
    for (_, task) in ctx.forwarders {
        task.abort();
    }
    info!("client disconnected");
}
