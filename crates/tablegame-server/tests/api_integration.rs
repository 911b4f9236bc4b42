#[allow(dead_code)]
mod common;

use tablegame_server::config::ServerConfig;

use common::{TestServer, ws_connect, ws_create_room};

#[tokio::test]
async fn server_responds_on_root() {
    let server = TestServer::new().await;
    let resp = reqwest::get(&server.base_url()).await.unwrap();
    // 200 if web_root has an index.html, 404 otherwise
    assert!(
        resp.status().is_success() || resp.status().as_u16() == 404,
        "Unexpected status: {}",
        resp.status()
    );
}

#[tokio::test]
async fn health_reports_rooms_and_connections() {
    let server = TestServer::new().await;
    let mut ws = ws_connect(&server.ws_url()).await;
    ws_create_room(&mut ws, "Alice").await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"]["websocket"], 1);
    assert_eq!(body["rooms"]["active"], 1);
    assert_eq!(body["rooms"]["players"], 1);
    assert_eq!(body["games"], 1);
}

#[tokio::test]
async fn ready_endpoint() {
    let server = TestServer::new().await;
    let resp = reqwest::get(format!("{}/ready", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ready");
}

#[tokio::test]
async fn list_games() {
    let server = TestServer::new().await;
    let resp = reqwest::get(format!("{}/api/v1/games", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    let body: serde_json::Value = resp.json().await.unwrap();
    let games = body["games"].as_array().unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["id"], "piZheXianZhi");
    assert_eq!(games[0]["name"], "屁者先知");
    assert_eq!(games[0]["icon"], "🎯");
}

#[tokio::test]
async fn game_detail_and_unknown_game() {
    let server = TestServer::new().await;
    let body: serde_json::Value =
        reqwest::get(format!("{}/api/v1/games/piZheXianZhi", server.base_url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert_eq!(body["min_players"], 3);
    assert_eq!(body["defaults"]["bigFartCount"], 1);
    assert_eq!(body["schema"]["fields"].as_array().unwrap().len(), 6);

    let resp = reqwest::get(format!("{}/api/v1/games/chess", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("chess"));
}

#[tokio::test]
async fn room_lookup() {
    let server = TestServer::new().await;
    let mut ws = ws_connect(&server.ws_url()).await;
    let (_, code) = ws_create_room(&mut ws, "Alice").await;

    let resp = reqwest::get(format!("{}/api/v1/rooms/{code}", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], code.as_str());
    assert_eq!(body["state"], "Waiting");
    assert_eq!(body["game_id"], "piZheXianZhi");
    assert_eq!(body["players"].as_array().unwrap().len(), 1);

    let resp = reqwest::get(format!("{}/api/v1/rooms/ZZZZ-9999", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = reqwest::get(format!("{}/api/v1/rooms/bogus", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn api_is_rate_limited_per_ip() {
    let mut config = ServerConfig::default();
    config.limits.api_rate_limit_burst = 3;
    config.limits.api_rate_limit_per_sec = 0.001;
    let server = TestServer::from_config(config).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/games", server.base_url());

    for _ in 0..3 {
        assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    }
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 429);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "rate limit exceeded");

    // Health checks are outside the API budget.
    let resp = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
