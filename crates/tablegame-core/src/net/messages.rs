use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config_schema::ConfigSchema;
use crate::game_trait::PlayerId;
use crate::player::{Avatar, Player};
use crate::room::RoomState;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    GameAction = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    SelectGame = 0x04,
    UpdateSettings = 0x05,
    ResetSettings = 0x07,

    // Server -> Client
    JoinRoomResponse = 0x06,
    GameState = 0x10,
    PlayerList = 0x11,
    RoomSettings = 0x12,
    GameStart = 0x13,
    ActionRejected = 0x14,
    GameEnd = 0x15,

    // Client -> Server (host control)
    RequestGameStart = 0x30,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::GameAction),
            0x02 => Some(Self::JoinRoom),
            0x03 => Some(Self::LeaveRoom),
            0x04 => Some(Self::SelectGame),
            0x05 => Some(Self::UpdateSettings),
            0x06 => Some(Self::JoinRoomResponse),
            0x07 => Some(Self::ResetSettings),
            0x10 => Some(Self::GameState),
            0x11 => Some(Self::PlayerList),
            0x12 => Some(Self::RoomSettings),
            0x13 => Some(Self::GameStart),
            0x14 => Some(Self::ActionRejected),
            0x15 => Some(Self::GameEnd),
            0x30 => Some(Self::RequestGameStart),
            _ => None,
        }
    }
}

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    LeaveRoom(LeaveRoomMsg),
    GameAction(GameActionMsg),
    SelectGame(SelectGameMsg),
    UpdateSettings(UpdateSettingsMsg),
    ResetSettings(ResetSettingsMsg),
    RequestGameStart(RequestGameStartMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::LeaveRoom(_) => MessageType::LeaveRoom,
            Self::GameAction(_) => MessageType::GameAction,
            Self::SelectGame(_) => MessageType::SelectGame,
            Self::UpdateSettings(_) => MessageType::UpdateSettings,
            Self::ResetSettings(_) => MessageType::ResetSettings,
            Self::RequestGameStart(_) => MessageType::RequestGameStart,
        }
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    JoinRoomResponse(JoinRoomResponseMsg),
    PlayerList(PlayerListMsg),
    RoomSettings(Box<RoomSettingsMsg>),
    GameStart(GameStartMsg),
    GameState(GameStateMsg),
    ActionRejected(ActionRejectedMsg),
    GameEnd(GameEndMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinRoomResponse(_) => MessageType::JoinRoomResponse,
            Self::PlayerList(_) => MessageType::PlayerList,
            Self::RoomSettings(_) => MessageType::RoomSettings,
            Self::GameStart(_) => MessageType::GameStart,
            Self::GameState(_) => MessageType::GameState,
            Self::ActionRejected(_) => MessageType::ActionRejected,
            Self::GameEnd(_) => MessageType::GameEnd,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server payloads
// ---------------------------------------------------------------------------

/// Join (or create, with an empty `room_code`) a room. A `session_token`
/// from an earlier `JoinRoomResponse` reclaims a seat after a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_code: String,
    pub player_name: String,
    pub avatar: Avatar,
    pub protocol_version: u8,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRoomMsg {
    pub player_id: PlayerId,
}

/// An encoded game-specific action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameActionMsg {
    pub player_id: PlayerId,
    pub action_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectGameMsg {
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsMsg {
    pub settings: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSettingsMsg {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGameStartMsg {}

// ---------------------------------------------------------------------------
// Server -> Client payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomResponseMsg {
    pub success: bool,
    pub player_id: Option<PlayerId>,
    pub room_code: Option<String>,
    pub room_state: Option<RoomState>,
    pub error: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerListMsg {
    pub players: Vec<Player>,
    pub host_id: PlayerId,
}

/// The room's selected game, its settings schema, and the current values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSettingsMsg {
    pub game_id: String,
    pub game_name: String,
    pub game_icon: String,
    pub schema: ConfigSchema,
    pub values: HashMap<String, Value>,
    pub updated_at: Option<u64>,
    pub updated_by: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartMsg {
    pub game_id: String,
    pub game_name: String,
    pub players: Vec<Player>,
    pub host_id: PlayerId,
}

/// The recipient's view of the game state. `seq` increases with every
/// state change within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateMsg {
    pub seq: u32,
    pub state_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRejectedMsg {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScoreEntry {
    pub player_id: PlayerId,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEndMsg {
    pub game_name: String,
    pub summary: String,
    pub final_scores: Vec<PlayerScoreEntry>,
}
