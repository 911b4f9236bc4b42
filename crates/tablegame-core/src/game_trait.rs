use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config_schema::ConfigSchema;
use crate::player::Player;

/// Unique identifier for a player in the game.
pub type PlayerId = u64;

/// Core trait that all Tablegame games must implement.
///
/// The server owns rooms, connections, and player tracking. A game only
/// validates actions, keeps its rules state, and produces per-player views.
/// Games are action driven: state changes happen in `apply_action`, while
/// `update` only advances timers.
pub trait PartyGame: Send + Sync {
    /// Game metadata for the lobby selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Host-editable settings for this game. Empty by default.
    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::default()
    }

    /// Called once when the host starts the game.
    fn init(&mut self, players: &[Player], config: &GameConfig) -> Result<(), GameError>;

    /// Apply an encoded action sent by a player.
    fn apply_action(
        &mut self,
        player_id: PlayerId,
        action: &[u8],
    ) -> Result<Vec<GameEvent>, GameError>;

    /// Advance timers by `dt` seconds.
    fn update(&mut self, dt: f32) -> Vec<GameEvent>;

    /// Serialize the full authoritative state (including hidden information).
    fn serialize_state(&self) -> Vec<u8>;

    /// Serialize the state as seen by one player. Spectators and unknown ids
    /// get the public view.
    fn serialize_view(&self, viewer: PlayerId) -> Vec<u8>;

    /// Restore authoritative state produced by `serialize_state`.
    fn apply_state(&mut self, state: &[u8]) -> Result<(), GameError>;

    /// Called when a player joins mid-game (as a spectator).
    fn player_joined(&mut self, player: &Player);

    /// Called when a player leaves permanently. A departure can settle the
    /// game, so it reports events like `apply_action` does.
    fn player_left(&mut self, player_id: PlayerId) -> Vec<GameEvent>;

    /// Called when the room migrates its host role mid-game.
    fn host_changed(&mut self, _new_host: PlayerId) {}

    /// Timer resolution in Hz for `update`.
    fn tick_rate(&self) -> f32 {
        4.0
    }

    /// Whether the game has reached a final result.
    fn is_finished(&self) -> bool;

    /// Final scores once the game is finished.
    fn results(&self) -> Vec<PlayerScore>;
}

/// Game metadata for the lobby selection screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
}

/// Configuration for a game session: the room's resolved settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    pub host_id: PlayerId,
    pub custom: HashMap<String, serde_json::Value>,
}

/// Events emitted by a game while applying actions or advancing timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Visible state changed; views should be re-sent.
    StateChanged,
    ScoreUpdate { player_id: PlayerId, score: i32 },
    PlayerEliminated { player_id: PlayerId },
    GameComplete { summary: String },
}

/// Score entry for a player at the end of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub score: i32,
}

/// Why a game rejected an action or configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The player is not allowed to perform this action (e.g. host only).
    NotPermitted(String),
    /// The action is malformed or targets something invalid.
    InvalidAction(String),
    /// The action is not allowed in the current phase.
    InvalidPhase(String),
    /// Settings could not be applied.
    InvalidConfig(String),
    /// Encoded action or state could not be decoded.
    Decode(String),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPermitted(m) => write!(f, "not permitted: {m}"),
            Self::InvalidAction(m) => write!(f, "invalid action: {m}"),
            Self::InvalidPhase(m) => write!(f, "invalid phase: {m}"),
            Self::InvalidConfig(m) => write!(f, "invalid config: {m}"),
            Self::Decode(m) => write!(f, "decode error: {m}"),
        }
    }
}

impl std::error::Error for GameError {}

/// Generates the `serialize_state` / `apply_state` pair shared by games whose
/// whole authoritative state lives in a `state: $StateType` field.
#[macro_export]
macro_rules! party_game_state_codec {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).unwrap_or_default()
        }

        fn apply_state(&mut self, state: &[u8]) -> Result<(), $crate::game_trait::GameError> {
            let s = rmp_serde::from_slice::<$StateType>(state)
                .map_err(|e| $crate::game_trait::GameError::Decode(e.to_string()))?;
            self.state = s;
            Ok(())
        }
    };
}
