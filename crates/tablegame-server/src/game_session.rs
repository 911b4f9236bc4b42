use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tablegame_core::game_registry::{GameCatalog, GameEntry, GameId};
use tablegame_core::game_trait::{GameConfig, GameEvent, PartyGame, PlayerId};
use tablegame_core::net::messages::{
    ActionRejectedMsg, GameEndMsg, GameStartMsg, GameStateMsg, PlayerScoreEntry, ServerMessage,
};
use tablegame_core::net::protocol::encode_server_message;
use tablegame_core::player::Player;

/// Commands sent from the room manager to a running game session.
#[derive(Debug)]
pub enum GameCommand {
    Action {
        player_id: PlayerId,
        action_data: Vec<u8>,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    HostChanged {
        host_id: PlayerId,
    },
    /// Re-send the current views (after a reconnect).
    Resync,
    Stop,
}

/// Output of a game session, delivered by the room's broadcast forwarder.
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    /// The same encoded message for everyone in the room.
    All(Bytes),
    /// One encoded message per seated player; anyone else receives
    /// `spectator`.
    Views {
        views: HashMap<PlayerId, Bytes>,
        spectator: Bytes,
    },
    /// An encoded message for a single player.
    To { player_id: PlayerId, data: Bytes },
    /// The session loop has exited. `completed` is false when it was aborted.
    GameEnded { completed: bool },
}

type ServerGameFactory = fn() -> Box<dyn PartyGame>;

/// Server-side game registry: factories plus the catalog built from them.
pub struct ServerGameRegistry {
    factories: HashMap<GameId, ServerGameFactory>,
    catalog: GameCatalog,
}

impl Default for ServerGameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerGameRegistry {
    pub fn new() -> Self {
        let mut factories: HashMap<GameId, ServerGameFactory> = HashMap::new();
        #[cfg(feature = "pizhe")]
        factories.insert(GameId::PiZheXianZhi, || {
            Box::new(tablegame_pizhe::PiZheXianZhi::new())
        });
        Self::from_factories(factories)
    }

    /// Build a registry from explicit factories. The catalog is derived
    /// from each game's metadata and schema.
    pub fn from_factories(factories: HashMap<GameId, ServerGameFactory>) -> Self {
        let entries = GameId::ALL
            .iter()
            .filter_map(|id| {
                let factory = factories.get(id)?;
                let game = factory();
                Some(GameEntry {
                    id: *id,
                    metadata: game.metadata(),
                    schema: game.config_schema(),
                })
            })
            .collect();
        Self {
            factories,
            catalog: GameCatalog::new(entries),
        }
    }

    pub fn create(&self, game_id: GameId) -> Option<Box<dyn PartyGame>> {
        self.factories.get(&game_id).map(|f| f())
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Number of registered game types.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}

/// Everything needed to start a session.
pub struct GameSessionConfig {
    pub game_id: GameId,
    pub players: Vec<Player>,
    pub host_id: PlayerId,
    pub settings: HashMap<String, serde_json::Value>,
}

pub type SessionHandles = (
    mpsc::UnboundedSender<GameCommand>,
    mpsc::UnboundedReceiver<GameBroadcast>,
    JoinHandle<()>,
);

/// Create and initialize the game, then spawn its session task.
pub fn spawn_game_session(
    registry: &ServerGameRegistry,
    config: GameSessionConfig,
) -> Result<SessionHandles, String> {
    let mut game = registry
        .create(config.game_id)
        .ok_or_else(|| "game does not exist".to_string())?;
    let game_name = registry.catalog().game_name(config.game_id.as_str());

    let game_config = GameConfig {
        host_id: config.host_id,
        custom: config.settings.clone(),
    };
    game.init(&config.players, &game_config)
        .map_err(|e| e.to_string())?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut session = GameSession {
            game,
            game_id: config.game_id,
            game_name,
            seq: 0,
            summary: String::new(),
            broadcast_tx,
        };
        session.run(config.players, config.host_id, cmd_rx).await;
    });

    Ok((cmd_tx, broadcast_rx, handle))
}

struct GameSession {
    game: Box<dyn PartyGame>,
    game_id: GameId,
    game_name: String,
    seq: u32,
    summary: String,
    broadcast_tx: mpsc::UnboundedSender<GameBroadcast>,
}

impl GameSession {
    async fn run(
        &mut self,
        mut players: Vec<Player>,
        host_id: PlayerId,
        mut cmd_rx: mpsc::UnboundedReceiver<GameCommand>,
    ) {
        let start = ServerMessage::GameStart(GameStartMsg {
            game_id: self.game_id.as_str().to_string(),
            game_name: self.game_name.clone(),
            players: players.clone(),
            host_id,
        });
        self.send_all(&start);
        self.send_views(&players);

        let tick_rate = self.game.tick_rate().max(0.1);
        let dt = 1.0 / tick_rate;
        let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let completed = loop {
            tokio::select! {
                _ = interval.tick() => {
                    let events = self.game.update(dt);
                    if !events.is_empty() {
                        self.note_events(&events);
                        self.send_views(&players);
                    }
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(GameCommand::Action { player_id, action_data }) => {
                            match self.game.apply_action(player_id, &action_data) {
                                Ok(events) => {
                                    self.note_events(&events);
                                    self.send_views(&players);
                                },
                                Err(e) => {
                                    tracing::debug!(player_id, error = %e, "Action rejected");
                                    self.reject(player_id, e.to_string());
                                },
                            }
                        },
                        Some(GameCommand::PlayerJoined { player }) => {
                            self.game.player_joined(&player);
                            players.push(player);
                            self.send_views(&players);
                        },
                        Some(GameCommand::PlayerLeft { player_id }) => {
                            let events = self.game.player_left(player_id);
                            self.note_events(&events);
                            players.retain(|p| p.id != player_id);
                            if players.is_empty() {
                                break false;
                            }
                            self.send_views(&players);
                        },
                        Some(GameCommand::HostChanged { host_id }) => {
                            self.game.host_changed(host_id);
                            self.send_views(&players);
                        },
                        Some(GameCommand::Resync) => self.send_views(&players),
                        Some(GameCommand::Stop) | None => break false,
                    }
                }
            }
            if self.game.is_finished() {
                break true;
            }
        };

        if completed {
            self.send_game_end();
        }
        let _ = self.broadcast_tx.send(GameBroadcast::GameEnded { completed });
    }

    fn note_events(&mut self, events: &[GameEvent]) {
        for event in events {
            if let GameEvent::GameComplete { summary } = event {
                self.summary.clone_from(summary);
            }
        }
    }

    fn send_all(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => {
                let _ = self.broadcast_tx.send(GameBroadcast::All(Bytes::from(data)));
            },
            Err(e) => tracing::error!(
                game = %self.game_id,
                message = ?msg.message_type(),
                error = %e,
                "Failed to encode broadcast"
            ),
        }
    }

    fn encode_view(&self, viewer: PlayerId) -> Option<Bytes> {
        let msg = ServerMessage::GameState(GameStateMsg {
            seq: self.seq,
            state_data: self.game.serialize_view(viewer),
        });
        match encode_server_message(&msg) {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                tracing::error!(viewer, seq = self.seq, error = %e, "Failed to encode GameState");
                None
            },
        }
    }

    /// Send every player their own view of the current state.
    fn send_views(&mut self, players: &[Player]) {
        self.seq = self.seq.wrapping_add(1);
        let views = players
            .iter()
            .filter_map(|p| self.encode_view(p.id).map(|v| (p.id, v)))
            .collect();
        let Some(spectator) = self.encode_view(PlayerId::MAX) else {
            return;
        };
        let _ = self
            .broadcast_tx
            .send(GameBroadcast::Views { views, spectator });
    }

    fn reject(&self, player_id: PlayerId, reason: String) {
        let msg = ServerMessage::ActionRejected(ActionRejectedMsg { reason });
        if let Ok(data) = encode_server_message(&msg) {
            let _ = self.broadcast_tx.send(GameBroadcast::To {
                player_id,
                data: Bytes::from(data),
            });
        }
    }

    fn send_game_end(&self) {
        let final_scores = self
            .game
            .results()
            .into_iter()
            .map(|s| PlayerScoreEntry {
                player_id: s.player_id,
                score: s.score,
            })
            .collect();
        tracing::info!(game = %self.game_id, summary = %self.summary, "Game complete");
        self.send_all(&ServerMessage::GameEnd(GameEndMsg {
            game_name: self.game_name.clone(),
            summary: self.summary.clone(),
            final_scores,
        }));
    }
}
