//! Player roles, elimination status and win-condition evaluation.

use serde::{Deserialize, Serialize};

use tablegame_core::game_trait::PlayerId;

use crate::deck::TOTAL_FART_CARDS;
use crate::skills::SkillState;

/// Minimum participants for a game.
pub const MIN_PLAYERS: usize = 3;

/// Color shown for a player who has not picked an identity yet.
pub const UNSELECTED_COLOR: &str = "#95a5a6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// 乘客
    Passenger,
    /// 屁者
    Assassin,
}

impl Identity {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Passenger => "乘客",
            Self::Assassin => "屁者",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Passenger => "#3498db",
            Self::Assassin => "#e74c3c",
        }
    }

    /// Plural faction name used in result summaries.
    pub fn faction(self) -> &'static str {
        match self {
            Self::Passenger => "passengers",
            Self::Assassin => "assassins",
        }
    }
}

/// Display name for an optional identity, `未知` when unset.
pub fn identity_display_name(identity: Option<Identity>) -> &'static str {
    identity.map_or("未知", Identity::display_name)
}

pub fn identity_color(identity: Option<Identity>) -> &'static str {
    identity.map_or(UNSELECTED_COLOR, Identity::color)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Alive,
    Out,
}

/// A participant's seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub identity: Option<Identity>,
    /// Unix epoch milliseconds of the latest identity choice.
    pub identity_selected_at: Option<u64>,
    pub status: PlayerStatus,
    pub eliminated_at: Option<u64>,
    pub skill: SkillState,
}

impl Seat {
    pub fn new(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            identity: None,
            identity_selected_at: None,
            status: PlayerStatus::Alive,
            eliminated_at: None,
            skill: SkillState::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }

    pub fn eliminate(&mut self, now_ms: u64) {
        self.status = PlayerStatus::Out;
        self.eliminated_at = Some(now_ms);
    }

    /// Record an identity choice. Players may change their mind until the
    /// reveal phase begins.
    pub fn select_identity(&mut self, identity: Identity, now_ms: u64) {
        self.identity = Some(identity);
        self.identity_selected_at = Some(now_ms);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStats {
    pub passengers: usize,
    pub assassins: usize,
    pub unselected: usize,
    pub total: usize,
}

pub fn all_identities_selected(seats: &[Seat]) -> bool {
    !seats.is_empty() && seats.iter().all(|s| s.identity.is_some())
}

pub fn identity_stats(seats: &[Seat]) -> IdentityStats {
    let mut stats = IdentityStats {
        total: seats.len(),
        ..IdentityStats::default()
    };
    for seat in seats {
        match seat.identity {
            Some(Identity::Passenger) => stats.passengers += 1,
            Some(Identity::Assassin) => stats.assassins += 1,
            None => stats.unselected += 1,
        }
    }
    stats
}

/// Check that the table can start: enough players, both factions present,
/// nobody undecided. All failures are reported.
pub fn validate_identity_selection(seats: &[Seat]) -> Result<IdentityStats, Vec<String>> {
    let stats = identity_stats(seats);
    let mut errors = Vec::new();

    if stats.total < MIN_PLAYERS {
        errors.push(format!(
            "not enough players: {}, at least {MIN_PLAYERS} required",
            stats.total
        ));
    }
    if stats.passengers == 0 {
        errors.push("at least 1 passenger required".to_string());
    }
    if stats.assassins == 0 {
        errors.push("at least 1 assassin required".to_string());
    }
    if stats.unselected > 0 {
        errors.push(format!(
            "{} players have not selected an identity",
            stats.unselected
        ));
    }

    if errors.is_empty() {
        Ok(stats)
    } else {
        Err(errors)
    }
}

pub fn alive_players(seats: &[Seat]) -> impl Iterator<Item = &Seat> {
    seats.iter().filter(|s| s.is_alive())
}

pub fn alive_count(seats: &[Seat], identity: Identity) -> usize {
    alive_players(seats)
        .filter(|s| s.identity == Some(identity))
        .count()
}

pub fn is_team_eliminated(seats: &[Seat], identity: Identity) -> bool {
    alive_count(seats, identity) == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinCondition {
    /// One faction has no players left alive.
    TeamElimination,
    /// Settlement after every fart card is revealed.
    FinalCount,
}

impl WinCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TeamElimination => "team_elimination",
            Self::FinalCount => "final_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub total_players: usize,
    pub passengers_alive: usize,
    pub assassins_alive: usize,
    pub fart_cards_revealed: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: Identity,
    pub reason: String,
    pub condition: WinCondition,
    pub statistics: GameStatistics,
    /// Unix epoch milliseconds.
    pub decided_at: u64,
}

fn statistics(seats: &[Seat], fart_revealed: u8) -> GameStatistics {
    GameStatistics {
        total_players: seats.len(),
        passengers_alive: alive_count(seats, Identity::Passenger),
        assassins_alive: alive_count(seats, Identity::Assassin),
        fart_cards_revealed: fart_revealed,
    }
}

/// A faction wiped out ends the game at once. Only applies when both
/// factions were dealt in.
pub fn check_immediate_win(seats: &[Seat], fart_revealed: u8, now_ms: u64) -> Option<GameResult> {
    let stats = identity_stats(seats);
    if stats.passengers == 0 || stats.assassins == 0 {
        return None;
    }

    let (winner, reason) = if is_team_eliminated(seats, Identity::Assassin) {
        (Identity::Passenger, "所有屁者都已出局")
    } else if is_team_eliminated(seats, Identity::Passenger) {
        (Identity::Assassin, "所有乘客都已出局")
    } else {
        return None;
    };

    Some(GameResult {
        winner,
        reason: reason.to_string(),
        condition: WinCondition::TeamElimination,
        statistics: statistics(seats, fart_revealed),
        decided_at: now_ms,
    })
}

/// Settlement by headcount once every fart card is face up. Assassins win
/// ties.
pub fn check_final_win(seats: &[Seat], fart_revealed: u8, now_ms: u64) -> Option<GameResult> {
    if fart_revealed < TOTAL_FART_CARDS {
        return None;
    }

    let stats = statistics(seats, fart_revealed);
    let (a, p) = (stats.assassins_alive, stats.passengers_alive);
    let (winner, reason) = if a >= p {
        (
            Identity::Assassin,
            format!("终局结算：屁者（{a}人）≥ 乘客（{p}人）"),
        )
    } else {
        (
            Identity::Passenger,
            format!("终局结算：屁者（{a}人）< 乘客（{p}人）"),
        )
    };

    Some(GameResult {
        winner,
        reason,
        condition: WinCondition::FinalCount,
        statistics: stats,
        decided_at: now_ms,
    })
}

/// Team elimination takes precedence over the final count.
pub fn check_game_end(seats: &[Seat], fart_revealed: u8, now_ms: u64) -> Option<GameResult> {
    check_immediate_win(seats, fart_revealed, now_ms)
        .or_else(|| check_final_win(seats, fart_revealed, now_ms))
}
