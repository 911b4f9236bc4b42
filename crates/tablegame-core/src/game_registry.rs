use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config_schema::ConfigSchema;
use crate::game_trait::GameMetadata;

/// Name returned for ids that are not in the catalog.
pub const UNKNOWN_GAME_NAME: &str = "Unknown game";
/// Icon returned for ids that are not in the catalog.
pub const UNKNOWN_GAME_ICON: &str = "❓";

/// Identifier of a registered game type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    #[serde(rename = "piZheXianZhi")]
    PiZheXianZhi,
}

impl GameId {
    pub const ALL: &[GameId] = &[GameId::PiZheXianZhi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PiZheXianZhi => "piZheXianZhi",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == s)
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered game entry in the game catalog.
#[derive(Debug, Clone)]
pub struct GameEntry {
    pub id: GameId,
    pub metadata: GameMetadata,
    pub schema: ConfigSchema,
}

/// Summary row for the game selection list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameListing {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
}

impl From<&GameEntry> for GameListing {
    fn from(entry: &GameEntry) -> Self {
        Self {
            id: entry.id.as_str().to_string(),
            name: entry.metadata.name.clone(),
            icon: entry.metadata.icon.clone(),
            description: entry.metadata.description.clone(),
            min_players: entry.metadata.min_players,
            max_players: entry.metadata.max_players,
        }
    }
}

/// Read-only catalog of the games a server offers.
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    entries: Vec<GameEntry>,
}

impl GameCatalog {
    pub fn new(entries: Vec<GameEntry>) -> Self {
        Self { entries }
    }

    pub fn list(&self) -> Vec<GameListing> {
        self.entries.iter().map(GameListing::from).collect()
    }

    pub fn get(&self, id: GameId) -> Option<&GameEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Look up by the wire id string.
    pub fn get_by_str(&self, id: &str) -> Option<&GameEntry> {
        GameId::from_str_opt(id).and_then(|id| self.get(id))
    }

    pub fn has_game(&self, id: &str) -> bool {
        self.get_by_str(id).is_some()
    }

    pub fn game_name(&self, id: &str) -> String {
        self.get_by_str(id)
            .map(|e| e.metadata.name.clone())
            .unwrap_or_else(|| UNKNOWN_GAME_NAME.to_string())
    }

    pub fn game_icon(&self, id: &str) -> String {
        self.get_by_str(id)
            .map(|e| e.metadata.icon.clone())
            .unwrap_or_else(|| UNKNOWN_GAME_ICON.to_string())
    }

    /// The first registered game, selected by new rooms.
    pub fn default_game(&self) -> Option<&GameEntry> {
        self.entries.first()
    }

    pub fn default_settings(&self, id: GameId) -> Option<HashMap<String, Value>> {
        self.get(id).map(|e| e.schema.defaults())
    }

    pub fn validate_settings(
        &self,
        id: GameId,
        settings: &HashMap<String, Value>,
    ) -> Result<(), Vec<String>> {
        match self.get(id) {
            Some(entry) => entry.schema.validate(settings),
            None => Err(vec!["game does not exist".to_string()]),
        }
    }
}
