pub mod api;
pub mod config;
pub mod error;
pub mod game_session;
pub mod health;
pub mod rate_limit;
pub mod room_manager;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let request_timeout = Duration::from_secs(config.limits.request_timeout_secs);
    let state = AppState::new(config);

    let api_routes = Router::new()
        .route("/games", get(api::list_games))
        .route("/games/{game_id}", get(api::get_game))
        .route("/rooms/{code}", get(api::get_room))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    rate_limit::api_rate_limit,
                ))
                .layer(TimeoutLayer::new(request_timeout))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        );

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
                .layer(CompressionLayer::new()),
        )
        .with_state(state.clone());

    (app, state)
}

/// Background task that expires held seats, drops idle rooms, and forgets
/// stale rate-limit buckets until `shutdown` is cancelled.
pub fn spawn_room_janitor(state: AppState, shutdown: CancellationToken) {
    let rooms_cfg = state.config.rooms.clone();
    let idle_timeout = Duration::from_secs(rooms_cfg.idle_timeout_secs);
    let period = Duration::from_secs(rooms_cfg.idle_check_interval_secs);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Room janitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    let (expired, idle) = {
                        let mut rooms = state.rooms.write().await;
                        (rooms.cleanup_expired_sessions(), rooms.cleanup_idle_rooms(idle_timeout))
                    };
                    let buckets = state.api_limiter.cleanup(idle_timeout).await;
                    if expired + idle + buckets > 0 {
                        tracing::info!(expired, idle, buckets, "Room janitor sweep");
                    }
                }
            }
        }
    });
}
