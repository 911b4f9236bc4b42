pub mod config_schema;
pub mod game_registry;
pub mod game_trait;
pub mod net;
pub mod player;
pub mod room;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;

    use crate::game_trait::{GameConfig, GameError, PartyGame, PlayerId};
    use crate::player::{Avatar, Player};

    /// Create `n` test players with sequential IDs starting at 1. Player 1 is host.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player {
                id: i as PlayerId + 1,
                display_name: format!("Player{}", i + 1),
                avatar: Avatar::for_seat(i),
                is_host: i == 0,
                is_spectator: false,
                is_online: true,
                joined_at: 0,
            })
            .collect()
    }

    /// A GameConfig hosted by player 1 with the given settings.
    pub fn default_config(custom: HashMap<String, serde_json::Value>) -> GameConfig {
        GameConfig { host_id: 1, custom }
    }

    // ================================================================
    // Game Trait Contract Tests
    // ================================================================
    // Every PartyGame implementation must pass these. Game crates call
    // them from their own #[cfg(test)] modules with a concrete instance.

    /// After init() with N players, serialize_state() must return non-empty bytes.
    pub fn contract_init_creates_state(
        game: &mut dyn PartyGame,
        player_count: usize,
        config: &GameConfig,
    ) {
        let players = make_players(player_count);
        game.init(&players, config)
            .unwrap_or_else(|e| panic!("init with {player_count} players failed: {e}"));
        assert!(
            !game.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
        assert!(!game.is_finished(), "a fresh game must not be finished");
    }

    /// Garbage action bytes must be rejected without touching state.
    pub fn contract_garbage_action_rejected(game: &mut dyn PartyGame, player_id: PlayerId) {
        let before = game.serialize_state();
        let result = game.apply_action(player_id, &[0xC1, 0xFF, 0x00]);
        assert!(
            matches!(result, Err(GameError::Decode(_))),
            "garbage input must be a decode error, got {result:?}"
        );
        assert_eq!(before, game.serialize_state(), "state must be unchanged");
    }

    /// A valid action must change the authoritative state.
    pub fn contract_valid_action_changes_state(
        game: &mut dyn PartyGame,
        player_id: PlayerId,
        action: &[u8],
    ) {
        let before = game.serialize_state();
        let events = game
            .apply_action(player_id, action)
            .unwrap_or_else(|e| panic!("valid action rejected: {e}"));
        assert!(!events.is_empty(), "a valid action must emit events");
        assert_ne!(before, game.serialize_state(), "state must change");
    }

    /// serialize_state → apply_state must be stable after one roundtrip.
    pub fn contract_state_roundtrip_preserves(game: &mut dyn PartyGame) {
        let state_a = game.serialize_state();
        game.apply_state(&state_a)
            .unwrap_or_else(|e| panic!("apply_state of own state failed: {e}"));
        let state_b = game.serialize_state();
        game.apply_state(&state_b)
            .unwrap_or_else(|e| panic!("apply_state of own state failed: {e}"));
        let state_c = game.serialize_state();
        assert_eq!(
            state_b, state_c,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// Every player (and an unknown viewer) must get a non-empty view.
    pub fn contract_views_for_everyone(game: &dyn PartyGame, player_count: usize) {
        for id in 1..=player_count as PlayerId {
            assert!(!game.serialize_view(id).is_empty(), "empty view for {id}");
        }
        assert!(!game.serialize_view(PlayerId::MAX).is_empty());
    }
}
