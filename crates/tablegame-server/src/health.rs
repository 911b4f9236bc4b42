use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub rooms: RoomInfo,
    pub games: usize,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct RoomInfo {
    pub active: usize,
    pub players: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ws = state.ws_connection_count.load(Ordering::Relaxed);
    let (active_rooms, total_players) = state.rooms.read().await.stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket: ws },
        rooms: RoomInfo {
            active: active_rooms,
            players: total_players,
        },
        games: state.game_registry.available_games(),
    })
}

/// GET /ready. 503 until at least one game is registered.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.game_registry.available_games() == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready: no games registered",
        );
    }
    (StatusCode::OK, "ready")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connections: ConnectionInfo { websocket: 5 },
            rooms: RoomInfo {
                active: 1,
                players: 3,
            },
            games: 1,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"websocket\":5"));
        assert!(json.contains("\"active\":1"));
    }

    #[tokio::test]
    async fn ready_with_default_games() {
        let state = AppState::new(ServerConfig::default());
        assert_eq!(readiness_check(State(state)).await, (StatusCode::OK, "ready"));
    }
}
