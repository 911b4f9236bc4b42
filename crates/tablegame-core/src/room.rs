use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config_schema::GameSettings;
use crate::game_trait::PlayerId;
use crate::player::Player;

/// Letters used in room codes. `I` and `O` are left out so codes read
/// unambiguously next to digits.
const CODE_LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Configuration for a Tablegame room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub max_players: u8,
    pub min_players: u8,
    /// How long a disconnected player's seat is held for reconnection.
    pub session_ttl: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            min_players: 3,
            session_ttl: Duration::from_secs(60),
        }
    }
}

/// Current state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Waiting,
    Playing,
    Finished,
}

impl RoomState {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: RoomState) -> bool {
        matches!(
            (self, next),
            (RoomState::Waiting, RoomState::Playing)
                | (RoomState::Playing, RoomState::Finished)
                | (RoomState::Playing, RoomState::Waiting)
                | (RoomState::Finished, RoomState::Playing)
                | (RoomState::Finished, RoomState::Waiting)
        )
    }

    /// Whether a game may be started from this state.
    pub fn accepts_game_start(self) -> bool {
        matches!(self, RoomState::Waiting | RoomState::Finished)
    }
}

/// A room: its members, lifecycle state, and the selected game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: String,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub state: RoomState,
    pub config: RoomConfig,
    pub settings: Option<GameSettings>,
    /// Unix epoch milliseconds.
    pub created_at: u64,
}

impl Room {
    /// Create a room with `host` as its only member.
    pub fn new(code: String, mut host: Player, created_at: u64) -> Self {
        host.is_host = true;
        Self {
            code,
            host_id: host.id,
            players: vec![host],
            state: RoomState::Waiting,
            config: RoomConfig::default(),
            settings: None,
            created_at,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players as usize
    }

    /// Players taking part in games (everyone except spectators).
    pub fn participants(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_spectator)
    }

    /// Move to `next` if the transition is valid. Returns whether it happened.
    pub fn transition(&mut self, next: RoomState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Hand the host role to `new_host`, keeping `is_host` flags consistent.
    pub fn set_host(&mut self, new_host: PlayerId) {
        self.host_id = new_host;
        for p in &mut self.players {
            p.is_host = p.id == new_host;
        }
    }

    /// Spectators become participants for the next game.
    pub fn promote_spectators(&mut self) {
        for p in &mut self.players {
            p.is_spectator = false;
        }
    }
}

/// Generate a room code in the form `ABCD-1234`.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(9);
    for _ in 0..4 {
        let idx = rng.random_range(0..CODE_LETTERS.len());
        code.push(CODE_LETTERS[idx] as char);
    }
    code.push('-');
    for _ in 0..4 {
        code.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    code
}

/// Whether `code` has the shape produced by [`generate_room_code`].
pub fn is_valid_room_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 9
        && bytes[..4].iter().all(|b| CODE_LETTERS.contains(b))
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_players;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..200 {
            let code = generate_room_code();
            assert!(is_valid_room_code(&code), "invalid code {code}");
            assert!(!code.contains('I') && !code.contains('O'));
        }
    }

    #[test]
    fn malformed_codes_rejected() {
        for code in ["", "ABCD1234", "abcd-1234", "ABCD-12345", "ABIO-1234", "ABCD-12A4"] {
            assert!(!is_valid_room_code(code), "{code} should be invalid");
        }
        assert!(is_valid_room_code("WXYZ-0000"));
    }

    #[test]
    fn transitions() {
        use RoomState::*;
        assert!(Waiting.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Finished));
        assert!(Playing.can_transition_to(Waiting));
        assert!(Finished.can_transition_to(Playing));
        assert!(Finished.can_transition_to(Waiting));
        assert!(!Waiting.can_transition_to(Finished));
        assert!(!Waiting.can_transition_to(Waiting));
        assert!(!Playing.can_transition_to(Playing));
    }

    #[test]
    fn new_room_marks_host() {
        let mut players = make_players(1);
        players[0].is_host = false;
        let room = Room::new("ABCD-1234".into(), players.remove(0), 0);
        assert_eq!(room.state, RoomState::Waiting);
        assert!(room.players[0].is_host);
        assert_eq!(room.host_id, room.players[0].id);
    }

    #[test]
    fn set_host_moves_flag() {
        let mut players = make_players(2);
        let mut room = Room::new("ABCD-1234".into(), players.remove(0), 0);
        room.players.extend(players);
        room.set_host(2);
        assert_eq!(room.host_id, 2);
        assert!(!room.players[0].is_host);
        assert!(room.players[1].is_host);
    }

    #[test]
    fn invalid_transition_keeps_state() {
        let mut room = Room::new("ABCD-1234".into(), make_players(1).remove(0), 0);
        assert!(!room.transition(RoomState::Finished));
        assert_eq!(room.state, RoomState::Waiting);
        assert!(room.transition(RoomState::Playing));
    }

    #[test]
    fn participants_skip_spectators() {
        let mut players = make_players(3);
        players[2].is_spectator = true;
        let mut room = Room::new("ABCD-1234".into(), players.remove(0), 0);
        room.players.extend(players);
        assert_eq!(room.participants().count(), 2);
        room.promote_spectators();
        assert_eq!(room.participants().count(), 3);
    }
}
