use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ConnectInfo;
use axum::extract::FromRequest;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use tablegame_core::game_trait::PlayerId;
use tablegame_core::net::messages::{
    ActionRejectedMsg, ClientMessage, JoinRoomMsg, MessageType, ServerMessage,
};
use tablegame_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, decode_message_type,
    encode_server_message,
};
use tablegame_core::room::{RoomState, is_valid_room_code};

use crate::rate_limit::TokenBucket;
use crate::room_manager::RoomManager;
use crate::state::{AppState, ConnectionGuard, IpConnectionGuard};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let max_per_ip = state.config.limits.max_ws_per_ip;
    let ip_guard =
        IpConnectionGuard::try_acquire(ip, Arc::clone(&state.ws_per_ip), max_per_ip).await;
    let Some(ip_guard) = ip_guard else {
        tracing::warn!(%ip, max_per_ip, "Per-IP WS connection limit reached");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    };

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, ip_guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _ip_guard: IpConnectionGuard) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first message must be a JoinRoom.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };
    let Ok(ClientMessage::JoinRoom(join)) = decode_client_message(&first_msg) else {
        send_join_error(&mut ws_sender, "Expected JoinRoom").await;
        return;
    };

    if join.protocol_version != 0 && join.protocol_version != PROTOCOL_VERSION {
        send_join_error(
            &mut ws_sender,
            &format!(
                "Protocol version mismatch: client={}, server={}",
                join.protocol_version, PROTOCOL_VERSION
            ),
        )
        .await;
        return;
    }

    let (room_code, player_id, rx) = match attempt_join(&join, &state).await {
        JoinResult::Success {
            room_code,
            player_id,
            session_token,
            room_state,
            rx,
        } => {
            let Ok(response) =
                RoomManager::make_join_response(player_id, &room_code, room_state, &session_token)
            else {
                tracing::warn!("Failed to encode JoinRoomResponse");
                return;
            };
            if ws_sender
                .send(Message::Binary(response.into()))
                .await
                .is_err()
            {
                state.rooms.write().await.disconnect(&room_code, player_id);
                return;
            }
            (room_code, player_id, rx)
        },
        JoinResult::Error(err) => {
            send_join_error(&mut ws_sender, &err).await;
            return;
        },
    };

    {
        let rooms = state.rooms.read().await;
        rooms.broadcast_player_list(&room_code);
        rooms.send_room_settings(&room_code, player_id);
    }

    spawn_writer(ws_sender, rx);

    let left = read_loop(&mut ws_receiver, &state, &room_code, player_id).await;

    let mut rooms = state.rooms.write().await;
    let destroyed = if left {
        rooms.remove_player(&room_code, player_id)
    } else {
        rooms.disconnect(&room_code, player_id)
    };
    if destroyed.is_none() {
        rooms.broadcast_player_list(&room_code);
    }
    drop(rooms);

    tracing::info!(player_id, room_code = %room_code, left, "Player disconnected");
}

enum JoinResult {
    Success {
        room_code: String,
        player_id: PlayerId,
        session_token: String,
        room_state: RoomState,
        rx: mpsc::Receiver<Bytes>,
    },
    Error(String),
}

/// Trimmed display name, or `None` if it is empty, too long, or contains
/// control characters.
pub fn validate_player_name(raw: &str, max_len: usize) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > max_len || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

async fn attempt_join(join: &JoinRoomMsg, state: &AppState) -> JoinResult {
    let buffer = state.config.limits.player_message_buffer;

    if let Some(ref token) = join.session_token {
        let (tx, rx) = mpsc::channel::<Bytes>(buffer);
        let mut rooms = state.rooms.write().await;
        match rooms.reconnect(token, tx) {
            Ok((code, pid, new_token)) => {
                let room_state = rooms.get_room_state(&code).unwrap_or(RoomState::Waiting);
                tracing::info!(player_id = pid, room = %code, "Player reconnected via session");
                return JoinResult::Success {
                    room_code: code,
                    player_id: pid,
                    session_token: new_token,
                    room_state,
                    rx,
                };
            },
            Err(e) => {
                tracing::debug!(error = %e, "Session reconnect failed, trying normal join");
            },
        }
    }

    let Some(name) = validate_player_name(&join.player_name, state.config.limits.max_name_len)
    else {
        return JoinResult::Error("Invalid player name".to_string());
    };

    let (tx, rx) = mpsc::channel::<Bytes>(buffer);
    let mut rooms = state.rooms.write().await;

    if join.room_code.is_empty() {
        let (code, pid, token) = rooms.create_room(name, join.avatar, tx);
        return JoinResult::Success {
            room_code: code,
            player_id: pid,
            session_token: token,
            room_state: RoomState::Waiting,
            rx,
        };
    }

    let code = join.room_code.trim().to_ascii_uppercase();
    if !is_valid_room_code(&code) {
        return JoinResult::Error("Invalid room code".to_string());
    }

    match rooms.join_room(&code, name, join.avatar, tx) {
        Ok((pid, token)) => {
            let room_state = rooms.get_room_state(&code).unwrap_or(RoomState::Waiting);
            tracing::info!(player_id = pid, room = %code, "Player joined");
            JoinResult::Success {
                room_code: code,
                player_id: pid,
                session_token: token,
                room_state,
                rx,
            }
        },
        Err(err) => JoinResult::Error(err),
    }
}

async fn send_join_error(ws_sender: &mut WsSink, error: &str) {
    if let Ok(response) = RoomManager::make_join_error(error)
        && let Err(e) = ws_sender.send(Message::Binary(response.into())).await
    {
        tracing::warn!(error = %e, "Failed to send join error response");
    }
}

fn spawn_writer(mut ws_sender: WsSink, mut rx: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

fn reject(rooms: &RoomManager, room_code: &str, player_id: PlayerId, reason: String) {
    let msg = ServerMessage::ActionRejected(ActionRejectedMsg { reason });
    if let Ok(data) = encode_server_message(&msg) {
        rooms.send_to_player(room_code, player_id, Bytes::from(data));
    }
}

/// Relay a connection's messages until it closes. Returns true if the
/// player asked to leave the room.
async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    room_code: &str,
    player_id: PlayerId,
) -> bool {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = TokenBucket::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.try_take() {
            tracing::warn!(player_id, room_code, "Rate limited");
            continue;
        }
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        let Ok(msg_type) = decode_message_type(&data) else {
            continue;
        };
        if matches!(
            msg_type,
            MessageType::JoinRoomResponse
                | MessageType::GameState
                | MessageType::PlayerList
                | MessageType::RoomSettings
                | MessageType::GameStart
                | MessageType::ActionRejected
                | MessageType::GameEnd
        ) {
            tracing::warn!(
                player_id,
                room_code,
                ?msg_type,
                "Rejected server-only message from client"
            );
            continue;
        }

        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id, room_code, error = %e, "Undecodable client message");
                continue;
            },
        };

        let mut rooms = state.rooms.write().await;
        rooms.touch_activity(room_code);

        match client_msg {
            ClientMessage::GameAction(action) => {
                if action.player_id != player_id {
                    tracing::warn!(player_id, claimed = action.player_id, "Spoofed game action");
                    continue;
                }
                if rooms.has_active_game(room_code) {
                    rooms.route_game_action(room_code, player_id, action.action_data);
                } else {
                    reject(&rooms, room_code, player_id, "No game in progress".to_string());
                }
            },
            ClientMessage::LeaveRoom(leave) => {
                if leave.player_id == player_id {
                    return true;
                }
            },
            ClientMessage::SelectGame(select) => {
                match rooms.select_game(room_code, player_id, &select.game_id) {
                    Ok(()) => rooms.broadcast_room_settings(room_code),
                    Err(e) => reject(&rooms, room_code, player_id, e),
                }
            },
            ClientMessage::UpdateSettings(update) => {
                match rooms.update_settings(room_code, player_id, update.settings) {
                    Ok(()) => rooms.broadcast_room_settings(room_code),
                    Err(e) => reject(&rooms, room_code, player_id, e),
                }
            },
            ClientMessage::ResetSettings(_) => match rooms.reset_settings(room_code, player_id) {
                Ok(()) => rooms.broadcast_room_settings(room_code),
                Err(e) => reject(&rooms, room_code, player_id, e),
            },
            ClientMessage::RequestGameStart(_) => {
                match rooms.start_game(room_code, player_id, Arc::clone(&state.rooms)) {
                    Ok(()) => rooms.broadcast_player_list(room_code),
                    Err(e) => {
                        tracing::warn!(player_id, room_code, error = %e, "Failed to start game");
                        reject(&rooms, room_code, player_id, e);
                    },
                }
            },
            ClientMessage::JoinRoom(_) => {
                tracing::debug!(player_id, room_code, "Ignoring JoinRoom on joined connection");
            },
        }
    }
    false
}
