use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;
use serde_json::Value;

use tablegame_core::config_schema::ConfigSchema;
use tablegame_core::game_registry::GameListing;
use tablegame_core::room::is_valid_room_code;

use crate::error::AppError;
use crate::room_manager::RoomSummary;
use crate::state::AppState;

/// Response for the game list.
#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<GameListing>,
}

/// One game with its settings schema and default values.
#[derive(Debug, Serialize)]
pub struct GameDetailResponse {
    #[serde(flatten)]
    pub listing: GameListing,
    pub schema: ConfigSchema,
    pub defaults: HashMap<String, Value>,
}

/// GET /api/v1/games
pub async fn list_games(State(state): State<AppState>) -> Json<GamesResponse> {
    Json(GamesResponse {
        games: state.game_registry.catalog().list(),
    })
}

/// GET /api/v1/games/{game_id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameDetailResponse>, AppError> {
    let entry = state
        .game_registry
        .catalog()
        .get_by_str(&game_id)
        .ok_or_else(|| AppError::NotFound(format!("game {game_id} does not exist")))?;
    Ok(Json(GameDetailResponse {
        listing: GameListing::from(entry),
        schema: entry.schema.clone(),
        defaults: entry.schema.defaults(),
    }))
}

/// GET /api/v1/rooms/{code}
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let code = code.to_ascii_uppercase();
    if !is_valid_room_code(&code) {
        return Err(AppError::BadRequest(format!("invalid room code: {code}")));
    }
    let rooms = state.rooms.read().await;
    rooms
        .room_summary(&code)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("room {code} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use tablegame_core::player::Avatar;
    use tablegame_core::room::RoomState;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn lists_registered_games() {
        let state = AppState::new(ServerConfig::default());
        let Json(resp) = list_games(State(state)).await;
        assert_eq!(resp.games.len(), 1);
        assert_eq!(resp.games[0].id, "piZheXianZhi");
        assert_eq!(resp.games[0].min_players, 3);
        assert_eq!(resp.games[0].max_players, 8);
    }

    #[tokio::test]
    async fn game_detail_includes_defaults() {
        let state = AppState::new(ServerConfig::default());
        let Json(detail) = get_game(State(state), Path("piZheXianZhi".to_string()))
            .await
            .unwrap();
        assert_eq!(detail.listing.name, "屁者先知");
        assert_eq!(detail.defaults["bigFartCount"], serde_json::json!(1));
        assert_eq!(detail.schema.fields.len(), detail.defaults.len());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], "piZheXianZhi", "listing fields are flattened");
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let state = AppState::new(ServerConfig::default());
        let result = get_game(State(state), Path("chess".to_string())).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn room_lookup() {
        let state = AppState::new(ServerConfig::default());
        let (tx, _rx) = mpsc::channel(8);
        let code = {
            let mut rooms = state.rooms.write().await;
            rooms.create_room("Alice".into(), Avatar::default(), tx).0
        };

        let Json(summary) = get_room(State(state.clone()), Path(code.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(summary.code, code);
        assert_eq!(summary.state, RoomState::Waiting);
        assert_eq!(summary.players[0].display_name, "Alice");

        let missing = get_room(State(state.clone()), Path("ZZZZ-9999".to_string())).await;
        assert!(matches!(missing.unwrap_err(), AppError::NotFound(_)));

        let invalid = get_room(State(state), Path("nope".to_string())).await;
        assert!(matches!(invalid.unwrap_err(), AppError::BadRequest(_)));
    }
}
