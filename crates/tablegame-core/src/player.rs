use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;

/// A player connected to a Tablegame room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub avatar: Avatar,
    pub is_host: bool,
    pub is_spectator: bool,
    pub is_online: bool,
    /// Unix epoch milliseconds.
    pub joined_at: u64,
}

/// Emoji avatar selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar(pub char);

impl Default for Avatar {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl Avatar {
    /// Predefined avatars offered in the lobby.
    pub const PALETTE: &[Avatar] = &[
        Avatar('😀'),
        Avatar('😎'),
        Avatar('🤔'),
        Avatar('😴'),
        Avatar('🤠'),
        Avatar('👻'),
        Avatar('🐱'),
        Avatar('🐼'),
    ];

    /// Whether this avatar is one of the palette entries.
    pub fn is_known(self) -> bool {
        Self::PALETTE.contains(&self)
    }

    /// Pick the palette entry for the n-th seat, wrapping around.
    pub fn for_seat(seat: usize) -> Self {
        Self::PALETTE[seat % Self::PALETTE.len()]
    }
}

impl std::fmt::Display for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_avatar_is_first_palette_entry() {
        assert_eq!(Avatar::default(), Avatar::PALETTE[0]);
        assert!(Avatar::default().is_known());
    }

    #[test]
    fn seat_avatar_wraps() {
        let n = Avatar::PALETTE.len();
        assert_eq!(Avatar::for_seat(0), Avatar::for_seat(n));
        assert_ne!(Avatar::for_seat(0), Avatar::for_seat(1));
    }

    #[test]
    fn unknown_avatar_detected() {
        assert!(!Avatar('x').is_known());
    }
}
