use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use tablegame_core::config_schema::GameSettings;
use tablegame_core::game_registry::GameId;
use tablegame_core::game_trait::PlayerId;
use tablegame_core::net::messages::{
    JoinRoomResponseMsg, PlayerListMsg, RoomSettingsMsg, ServerMessage,
};
use tablegame_core::net::protocol::{ProtocolError, encode_server_message};
use tablegame_core::player::{Avatar, Player};
use tablegame_core::room::{Room, RoomState};
use tablegame_core::time::now_millis;

use crate::game_session::{
    GameBroadcast, GameCommand, GameSessionConfig, ServerGameRegistry, spawn_game_session,
};
use crate::state::SharedRoomManager;

/// Per-player sender for outbound WebSocket binary messages.
/// Bounded so a slow client cannot grow server memory without limit.
pub type PlayerSender = mpsc::Sender<Bytes>;

type SharedSenders = Arc<Mutex<HashMap<PlayerId, PlayerSender>>>;

/// A seat held for a player who dropped mid-game.
struct DisconnectedSession {
    room_code: String,
    player_id: PlayerId,
    disconnected_at: Instant,
}

/// Manages all active rooms and their connected players.
pub struct RoomManager {
    rooms: HashMap<String, RoomEntry>,
    next_player_id: PlayerId,
    /// session_token → held seat.
    sessions: HashMap<String, DisconnectedSession>,
    session_ttl: Duration,
    registry: Arc<ServerGameRegistry>,
}

struct RoomEntry {
    room: Room,
    connections: HashMap<PlayerId, PlayerSender>,
    last_activity: Instant,
    /// player_id → session_token for connected players.
    player_sessions: HashMap<PlayerId, String>,
    game_command_tx: Option<mpsc::UnboundedSender<GameCommand>>,
    game_task: Option<JoinHandle<()>>,
    broadcast_task: Option<JoinHandle<()>>,
    /// Senders reachable by the broadcast forwarder. Kept in sync with
    /// `connections` so joiners and reconnects receive game output.
    broadcast_senders: SharedSenders,
}

impl RoomEntry {
    fn send_command(&self, cmd: GameCommand) {
        if let Some(ref tx) = self.game_command_tx
            && let Err(e) = tx.send(cmd)
        {
            tracing::debug!(room = %self.room.code, error = %e, "Game session gone");
        }
    }

    fn add_connection(&mut self, player_id: PlayerId, sender: PlayerSender) {
        lock(&self.broadcast_senders).insert(player_id, sender.clone());
        self.connections.insert(player_id, sender);
    }

    fn drop_connection(&mut self, player_id: PlayerId) {
        lock(&self.broadcast_senders).remove(&player_id);
        self.connections.remove(&player_id);
    }

    fn settings_message(&self, registry: &ServerGameRegistry) -> Option<ServerMessage> {
        let settings = self.room.settings.as_ref()?;
        let catalog = registry.catalog();
        let entry = catalog.get(settings.game_id)?;
        Some(ServerMessage::RoomSettings(Box::new(RoomSettingsMsg {
            game_id: settings.game_id.as_str().to_string(),
            game_name: entry.metadata.name.clone(),
            game_icon: entry.metadata.icon.clone(),
            schema: entry.schema.clone(),
            values: settings.values.clone(),
            updated_at: settings.updated_at,
            updated_by: settings.updated_by,
        })))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Public room snapshot served by the REST API.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub code: String,
    pub state: RoomState,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub max_players: u8,
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub created_at: u64,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(Arc::new(ServerGameRegistry::new()), Duration::from_secs(60))
    }
}

impl RoomManager {
    pub fn new(registry: Arc<ServerGameRegistry>, session_ttl: Duration) -> Self {
        Self {
            rooms: HashMap::new(),
            next_player_id: 1,
            sessions: HashMap::new(),
            session_ttl,
            registry,
        }
    }

    fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    fn generate_session_token() -> String {
        Uuid::new_v4().to_string()
    }

    fn make_player(id: PlayerId, name: String, avatar: Avatar, seat: usize) -> Player {
        Player {
            id,
            display_name: name,
            avatar: if avatar.is_known() {
                avatar
            } else {
                Avatar::for_seat(seat)
            },
            is_host: false,
            is_spectator: false,
            is_online: true,
            joined_at: now_millis(),
        }
    }

    /// Create a new room with the default game selected.
    /// Returns (room_code, player_id, session_token) for the host.
    pub fn create_room(
        &mut self,
        player_name: String,
        avatar: Avatar,
        sender: PlayerSender,
    ) -> (String, PlayerId, String) {
        let code = generate_unique_room_code(&self.rooms);
        let player_id = self.alloc_player_id();
        let session_token = Self::generate_session_token();

        let host = Self::make_player(player_id, player_name, avatar, 0);
        let mut room = Room::new(code.clone(), host, now_millis());
        room.config.session_ttl = self.session_ttl;
        room.settings = self
            .registry
            .catalog()
            .default_game()
            .map(|entry| GameSettings::defaults_for(entry.id, &entry.schema));

        let mut entry = RoomEntry {
            room,
            connections: HashMap::new(),
            last_activity: Instant::now(),
            player_sessions: HashMap::new(),
            game_command_tx: None,
            game_task: None,
            broadcast_task: None,
            broadcast_senders: Arc::new(Mutex::new(HashMap::new())),
        };
        entry.add_connection(player_id, sender);
        entry
            .player_sessions
            .insert(player_id, session_token.clone());
        self.rooms.insert(code.clone(), entry);

        tracing::info!(room = %code, player_id, "Room created");
        (code, player_id, session_token)
    }

    /// Join an existing room. Players joining a game in progress watch as
    /// spectators.
    pub fn join_room(
        &mut self,
        room_code: &str,
        player_name: String,
        avatar: Avatar,
        sender: PlayerSender,
    ) -> Result<(PlayerId, String), String> {
        {
            let entry = self
                .rooms
                .get(room_code)
                .ok_or_else(|| "Room not found".to_string())?;
            if entry.room.is_full() {
                return Err("Room is full".to_string());
            }
        }

        let player_id = self.alloc_player_id();
        let session_token = Self::generate_session_token();
        let entry = self
            .rooms
            .get_mut(room_code)
            .ok_or_else(|| "Room not found".to_string())?;

        let mut player =
            Self::make_player(player_id, player_name, avatar, entry.room.players.len());
        player.is_spectator = entry.room.state == RoomState::Playing;
        entry.last_activity = Instant::now();
        entry.room.players.push(player.clone());
        entry.add_connection(player_id, sender);
        entry
            .player_sessions
            .insert(player_id, session_token.clone());

        if player.is_spectator {
            entry.send_command(GameCommand::PlayerJoined { player });
        }

        Ok((player_id, session_token))
    }

    /// Reclaim a held seat with a session token. Returns
    /// (room_code, player_id, new_session_token).
    pub fn reconnect(
        &mut self,
        session_token: &str,
        sender: PlayerSender,
    ) -> Result<(String, PlayerId, String), String> {
        let session = self
            .sessions
            .remove(session_token)
            .ok_or_else(|| "Invalid or expired session".to_string())?;
        if session.disconnected_at.elapsed() > self.session_ttl {
            return Err("Session expired".to_string());
        }

        let entry = self
            .rooms
            .get_mut(&session.room_code)
            .ok_or_else(|| "Room no longer exists".to_string())?;
        let Some(player) = entry
            .room
            .players
            .iter_mut()
            .find(|p| p.id == session.player_id)
        else {
            return Err("Player slot no longer available".to_string());
        };
        player.is_online = true;

        let new_token = Self::generate_session_token();
        entry.add_connection(session.player_id, sender);
        entry
            .player_sessions
            .insert(session.player_id, new_token.clone());
        entry.last_activity = Instant::now();
        entry.send_command(GameCommand::Resync);

        Ok((session.room_code, session.player_id, new_token))
    }

    /// Handle a closed connection. A player dropping out of a game in
    /// progress keeps their seat for the session TTL; otherwise they leave.
    /// Returns the room code if the room was destroyed.
    pub fn disconnect(&mut self, room_code: &str, player_id: PlayerId) -> Option<String> {
        let entry = self.rooms.get_mut(room_code)?;
        entry.drop_connection(player_id);

        if entry.room.state == RoomState::Playing
            && let Some(token) = entry.player_sessions.remove(&player_id)
        {
            if let Some(p) = entry.room.players.iter_mut().find(|p| p.id == player_id) {
                p.is_online = false;
            }
            self.sessions.insert(
                token,
                DisconnectedSession {
                    room_code: room_code.to_string(),
                    player_id,
                    disconnected_at: Instant::now(),
                },
            );
            tracing::info!(
                player_id,
                room = room_code,
                "Player disconnected mid-game, seat held for reconnection"
            );
            return None;
        }

        self.remove_player(room_code, player_id)
    }

    /// Remove a player permanently. Migrates the host role when needed.
    /// Returns the room code if the room was destroyed (empty after leave).
    pub fn remove_player(&mut self, room_code: &str, player_id: PlayerId) -> Option<String> {
        let entry = self.rooms.get_mut(room_code)?;
        entry.drop_connection(player_id);
        entry.player_sessions.remove(&player_id);
        entry.room.players.retain(|p| p.id != player_id);
        entry.send_command(GameCommand::PlayerLeft { player_id });

        if entry.room.players.is_empty() {
            entry.send_command(GameCommand::Stop);
            self.rooms.remove(room_code);
            self.sessions.retain(|_, s| s.room_code != room_code);
            tracing::info!(room = room_code, "Room closed");
            return Some(room_code.to_string());
        }

        if entry.room.host_id == player_id
            && let Some(new_host) = entry
                .room
                .players
                .iter()
                .find(|p| p.is_online)
                .or_else(|| entry.room.players.first())
                .map(|p| p.id)
        {
            entry.room.set_host(new_host);
            entry.send_command(GameCommand::HostChanged { host_id: new_host });
            tracing::info!(room = room_code, new_host, "Host migrated");
        }

        None
    }

    /// Drop held seats whose TTL has passed, removing those players from
    /// their rooms. Returns the number of sessions expired.
    pub fn cleanup_expired_sessions(&mut self) -> usize {
        let ttl = self.session_ttl;
        let expired: Vec<(String, PlayerId)> = self
            .sessions
            .values()
            .filter(|s| s.disconnected_at.elapsed() > ttl)
            .map(|s| (s.room_code.clone(), s.player_id))
            .collect();
        self.sessions
            .retain(|_, s| s.disconnected_at.elapsed() <= ttl);

        for (room_code, player_id) in &expired {
            if self.remove_player(room_code, *player_id).is_none() {
                self.broadcast_player_list(room_code);
            }
        }
        expired.len()
    }

    fn host_entry_mut(
        &mut self,
        room_code: &str,
        requester_id: PlayerId,
        what: &str,
    ) -> Result<&mut RoomEntry, String> {
        let entry = self
            .rooms
            .get_mut(room_code)
            .ok_or_else(|| "Room not found".to_string())?;
        if entry.room.host_id != requester_id {
            return Err(format!("Only the host can {what}"));
        }
        if entry.room.state == RoomState::Playing {
            return Err("Game already in progress".to_string());
        }
        entry.last_activity = Instant::now();
        Ok(entry)
    }

    /// Host selects the game to play next. Switching games resets settings
    /// to the new game's defaults.
    pub fn select_game(
        &mut self,
        room_code: &str,
        requester_id: PlayerId,
        game_id: &str,
    ) -> Result<(), String> {
        let registry = Arc::clone(&self.registry);
        let entry = registry
            .catalog()
            .get_by_str(game_id)
            .ok_or_else(|| "game does not exist".to_string())?;
        let room = self.host_entry_mut(room_code, requester_id, "select the game")?;
        if room
            .room
            .settings
            .as_ref()
            .is_some_and(|s| s.game_id == entry.id)
        {
            return Ok(());
        }
        room.room.settings = Some(GameSettings::defaults_for(entry.id, &entry.schema));
        tracing::info!(room = room_code, game = %entry.id, "Game selected");
        Ok(())
    }

    /// Host saves settings. Values are overlaid on the defaults and the
    /// full result must pass the game's schema.
    pub fn update_settings(
        &mut self,
        room_code: &str,
        requester_id: PlayerId,
        values: HashMap<String, Value>,
    ) -> Result<(), String> {
        let registry = Arc::clone(&self.registry);
        let room = self.host_entry_mut(room_code, requester_id, "change settings")?;
        let game_id = selected_game(&room.room)?;
        let entry = registry
            .catalog()
            .get(game_id)
            .ok_or_else(|| "game does not exist".to_string())?;

        let resolved = entry.schema.resolve(&values);
        entry
            .schema
            .validate(&resolved)
            .map_err(|errors| format!("Invalid settings: {}", errors.join(", ")))?;

        room.room.settings = Some(GameSettings {
            game_id,
            values: resolved,
            updated_at: Some(now_millis()),
            updated_by: Some(requester_id),
        });
        Ok(())
    }

    /// Host restores the selected game's default settings.
    pub fn reset_settings(&mut self, room_code: &str, requester_id: PlayerId) -> Result<(), String> {
        let registry = Arc::clone(&self.registry);
        let room = self.host_entry_mut(room_code, requester_id, "change settings")?;
        let game_id = selected_game(&room.room)?;
        let entry = registry
            .catalog()
            .get(game_id)
            .ok_or_else(|| "game does not exist".to_string())?;
        room.room.settings = Some(GameSettings::defaults_for(game_id, &entry.schema));
        Ok(())
    }

    /// Start a server-authoritative session of the selected game.
    pub fn start_game(
        &mut self,
        room_code: &str,
        requester_id: PlayerId,
        rooms: SharedRoomManager,
    ) -> Result<(), String> {
        let registry = Arc::clone(&self.registry);
        let entry = self
            .rooms
            .get_mut(room_code)
            .ok_or_else(|| "Room not found".to_string())?;
        if entry.room.host_id != requester_id {
            return Err("Only the host can start the game".to_string());
        }
        if !entry.room.state.accepts_game_start() {
            return Err("Game already in progress".to_string());
        }
        let game_id = selected_game(&entry.room)?;
        let game = registry
            .catalog()
            .get(game_id)
            .ok_or_else(|| "game does not exist".to_string())?;
        let settings = entry
            .room
            .settings
            .as_ref()
            .map(|s| game.schema.resolve(&s.values))
            .unwrap_or_default();
        game.schema
            .validate(&settings)
            .map_err(|errors| format!("Invalid settings: {}", errors.join(", ")))?;

        let online = entry.room.players.iter().filter(|p| p.is_online).count();
        let min = game.metadata.min_players.max(entry.room.config.min_players) as usize;
        if online < min {
            return Err(format!("At least {min} players are needed to start"));
        }
        if online > game.metadata.max_players as usize {
            return Err(format!(
                "At most {} players can play {}",
                game.metadata.max_players, game.metadata.name
            ));
        }

        entry.room.promote_spectators();
        let (cmd_tx, broadcast_rx, game_handle) = spawn_game_session(
            &registry,
            GameSessionConfig {
                game_id,
                players: entry.room.players.clone(),
                host_id: entry.room.host_id,
                settings,
            },
        )?;

        let senders = Arc::clone(&entry.broadcast_senders);
        let code = room_code.to_string();
        let broadcast_handle = tokio::spawn(async move {
            let completed = forward_broadcasts(broadcast_rx, senders, &code).await;
            let mut mgr = rooms.write().await;
            mgr.end_game_session(&code, completed);
            mgr.broadcast_player_list(&code);
        });

        entry.game_command_tx = Some(cmd_tx);
        entry.game_task = Some(game_handle);
        entry.broadcast_task = Some(broadcast_handle);
        entry.room.transition(RoomState::Playing);
        entry.last_activity = Instant::now();

        tracing::info!(room = room_code, game = %game_id, players = online, "Game started");
        Ok(())
    }

    /// Route a player's encoded game action to the active session.
    pub fn route_game_action(&self, room_code: &str, player_id: PlayerId, action_data: Vec<u8>) {
        if let Some(entry) = self.rooms.get(room_code) {
            entry.send_command(GameCommand::Action {
                player_id,
                action_data,
            });
        }
    }

    pub fn has_active_game(&self, room_code: &str) -> bool {
        self.rooms
            .get(room_code)
            .and_then(|e| e.game_command_tx.as_ref())
            .is_some()
    }

    /// Tear down a finished or aborted session. Completed games leave the
    /// room `Finished`, aborted ones return it to `Waiting`.
    pub fn end_game_session(&mut self, room_code: &str, completed: bool) {
        let Some(entry) = self.rooms.get_mut(room_code) else {
            return;
        };
        entry.send_command(GameCommand::Stop);
        entry.game_command_tx = None;
        entry.game_task = None;
        entry.broadcast_task = None;
        let next = if completed {
            RoomState::Finished
        } else {
            RoomState::Waiting
        };
        if !entry.room.transition(next) {
            tracing::warn!(
                room = room_code,
                from = ?entry.room.state,
                to = ?next,
                "Invalid room state transition"
            );
        }
    }

    pub fn get_room_state(&self, room_code: &str) -> Option<RoomState> {
        self.rooms.get(room_code).map(|e| e.room.state)
    }

    pub fn get_host_id(&self, room_code: &str) -> Option<PlayerId> {
        self.rooms.get(room_code).map(|e| e.room.host_id)
    }

    pub fn get_players(&self, room_code: &str) -> Option<Vec<Player>> {
        self.rooms.get(room_code).map(|e| e.room.players.clone())
    }

    pub fn get_settings(&self, room_code: &str) -> Option<GameSettings> {
        self.rooms.get(room_code)?.room.settings.clone()
    }

    pub fn room_summary(&self, room_code: &str) -> Option<RoomSummary> {
        let room = &self.rooms.get(room_code)?.room;
        let catalog = self.registry.catalog();
        let game_id = room.settings.as_ref().map(|s| s.game_id.as_str());
        Some(RoomSummary {
            code: room.code.clone(),
            state: room.state,
            host_id: room.host_id,
            players: room.players.clone(),
            max_players: room.config.max_players,
            game_id: game_id.map(str::to_string),
            game_name: game_id.map(|id| catalog.game_name(id)),
            created_at: room.created_at,
        })
    }

    /// (active rooms, total players).
    pub fn stats(&self) -> (usize, usize) {
        let players = self.rooms.values().map(|e| e.room.players.len()).sum();
        (self.rooms.len(), players)
    }

    /// Send a raw binary message to a specific player.
    pub fn send_to_player(&self, room_code: &str, player_id: PlayerId, data: Bytes) {
        if let Some(entry) = self.rooms.get(room_code)
            && let Some(sender) = entry.connections.get(&player_id)
            && let Err(e) = sender.try_send(data)
        {
            tracing::debug!(
                player_id, room = room_code, error = %e,
                "Failed to send to player (slow or disconnected)"
            );
        }
    }

    /// Broadcast raw binary data to all connected players in a room.
    pub fn broadcast_to_room(&self, room_code: &str, data: Bytes) {
        if let Some(entry) = self.rooms.get(room_code) {
            for (&pid, sender) in &entry.connections {
                if let Err(e) = sender.try_send(data.clone()) {
                    tracing::debug!(
                        player_id = pid, room = room_code, error = %e,
                        "Skipping broadcast to slow client"
                    );
                }
            }
        }
    }

    fn broadcast_message(&self, room_code: &str, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.broadcast_to_room(room_code, Bytes::from(data)),
            Err(e) => tracing::error!(
                room = room_code,
                message = ?msg.message_type(),
                error = %e,
                "Failed to encode room broadcast"
            ),
        }
    }

    /// Build and broadcast a PlayerList update to everyone in the room.
    pub fn broadcast_player_list(&self, room_code: &str) {
        if let Some(entry) = self.rooms.get(room_code) {
            let msg = ServerMessage::PlayerList(PlayerListMsg {
                players: entry.room.players.clone(),
                host_id: entry.room.host_id,
            });
            self.broadcast_message(room_code, &msg);
        }
    }

    /// Broadcast the selected game and its settings.
    pub fn broadcast_room_settings(&self, room_code: &str) {
        if let Some(msg) = self
            .rooms
            .get(room_code)
            .and_then(|e| e.settings_message(&self.registry))
        {
            self.broadcast_message(room_code, &msg);
        }
    }

    /// Send the selected game and its settings to one player.
    pub fn send_room_settings(&self, room_code: &str, player_id: PlayerId) {
        if let Some(msg) = self
            .rooms
            .get(room_code)
            .and_then(|e| e.settings_message(&self.registry))
            && let Ok(data) = encode_server_message(&msg)
        {
            self.send_to_player(room_code, player_id, Bytes::from(data));
        }
    }

    /// Build a JoinRoomResponse success message.
    pub fn make_join_response(
        player_id: PlayerId,
        room_code: &str,
        room_state: RoomState,
        session_token: &str,
    ) -> Result<Vec<u8>, ProtocolError> {
        encode_server_message(&ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
            success: true,
            player_id: Some(player_id),
            room_code: Some(room_code.to_string()),
            room_state: Some(room_state),
            error: None,
            session_token: Some(session_token.to_string()),
        }))
    }

    /// Build a JoinRoomResponse error message.
    pub fn make_join_error(error: &str) -> Result<Vec<u8>, ProtocolError> {
        encode_server_message(&ServerMessage::JoinRoomResponse(JoinRoomResponseMsg {
            success: false,
            player_id: None,
            room_code: None,
            room_state: None,
            error: Some(error.to_string()),
            session_token: None,
        }))
    }

    /// Touch room activity timestamp (call on any incoming message).
    pub fn touch_activity(&mut self, room_code: &str) {
        if let Some(entry) = self.rooms.get_mut(room_code) {
            entry.last_activity = Instant::now();
        }
    }

    /// Remove rooms idle for longer than `max_idle`, stopping their games.
    /// Returns the number of rooms removed.
    pub fn cleanup_idle_rooms(&mut self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.rooms.len();
        self.rooms.retain(|code, entry| {
            let keep = now.duration_since(entry.last_activity) < max_idle;
            if !keep {
                entry.send_command(GameCommand::Stop);
                tracing::info!(room = %code, "Removing idle room");
            }
            keep
        });
        let rooms = &self.rooms;
        self.sessions.retain(|_, s| rooms.contains_key(&s.room_code));
        before - self.rooms.len()
    }

    pub fn room_exists(&self, room_code: &str) -> bool {
        self.rooms.contains_key(room_code)
    }
}

fn selected_game(room: &Room) -> Result<GameId, String> {
    room.settings
        .as_ref()
        .map(|s| s.game_id)
        .ok_or_else(|| "No game selected".to_string())
}

/// Deliver session output to the room's current connections. Returns whether
/// the game completed (as opposed to being aborted).
async fn forward_broadcasts(
    mut broadcast_rx: mpsc::UnboundedReceiver<GameBroadcast>,
    senders: SharedSenders,
    room_code: &str,
) -> bool {
    let deliver = |player_id: PlayerId, sender: &PlayerSender, data: Bytes| {
        if sender.try_send(data).is_err() {
            tracing::debug!(
                player_id,
                room = room_code,
                "Skipping broadcast to slow client (channel full or closed)"
            );
        }
    };

    while let Some(broadcast) = broadcast_rx.recv().await {
        match broadcast {
            GameBroadcast::All(data) => {
                let snapshot = lock(&senders).clone();
                for (&player_id, sender) in &snapshot {
                    deliver(player_id, sender, data.clone());
                }
            },
            GameBroadcast::Views { views, spectator } => {
                let snapshot = lock(&senders).clone();
                for (&player_id, sender) in &snapshot {
                    let data = views.get(&player_id).unwrap_or(&spectator).clone();
                    deliver(player_id, sender, data);
                }
            },
            GameBroadcast::To { player_id, data } => {
                let sender = lock(&senders).get(&player_id).cloned();
                if let Some(sender) = sender {
                    deliver(player_id, &sender, data);
                }
            },
            GameBroadcast::GameEnded { completed } => {
                tracing::info!(room = room_code, completed, "Game session ended");
                return completed;
            },
        }
    }
    false
}

/// Generate a room code not used by any existing room.
fn generate_unique_room_code(existing: &HashMap<String, RoomEntry>) -> String {
    loop {
        let code = tablegame_core::room::generate_room_code();
        if !existing.contains_key(&code) {
            return code;
        }
    }
}
