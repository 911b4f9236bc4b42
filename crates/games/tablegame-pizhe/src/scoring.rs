use tablegame_core::game_trait::PlayerScore;

use crate::identity::{GameResult, Seat};

/// Points for each member of the winning faction.
pub const WIN_POINTS: i32 = 100;

/// One score per seat: `win_points` for the winning faction, 0 otherwise.
/// Eliminated winners still score.
pub fn final_scores(seats: &[Seat], result: &GameResult, win_points: i32) -> Vec<PlayerScore> {
    seats
        .iter()
        .map(|seat| PlayerScore {
            player_id: seat.player_id,
            score: if seat.identity == Some(result.winner) {
                win_points
            } else {
                0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, PlayerStatus, check_game_end};

    #[test]
    fn winners_score_losers_do_not() {
        let mut seats: Vec<Seat> = (1..=3).map(|id| Seat::new(id, "x")).collect();
        seats[0].select_identity(Identity::Passenger, 0);
        seats[1].select_identity(Identity::Passenger, 0);
        seats[2].select_identity(Identity::Assassin, 0);
        seats[2].status = PlayerStatus::Out;
        seats[1].status = PlayerStatus::Out;

        let result = check_game_end(&seats, 0, 0).unwrap();
        let scores = final_scores(&seats, &result, WIN_POINTS);
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].score, WIN_POINTS);
        assert_eq!(scores[1].score, WIN_POINTS);
        assert_eq!(scores[2].score, 0);
    }
}
