use serde::{Deserialize, Serialize};

use tablegame_core::game_trait::PlayerId;

use crate::deck::Deck;

/// How long a floor stays visible after `ViewFloor`, in seconds.
pub const VIEW_FLOOR_SECS: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillType {
    #[default]
    NoSkill,
    /// Peek at one unrevealed floor card.
    ViewFloor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillConfig {
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub max_usage: u8,
}

impl SkillType {
    pub fn config(self) -> SkillConfig {
        match self {
            Self::NoSkill => SkillConfig {
                name: "无技能",
                icon: "🚫",
                description: "没有特殊技能",
                max_usage: 0,
            },
            Self::ViewFloor => SkillConfig {
                name: "查看楼层牌",
                icon: "🔮",
                description: "临时查看一张未揭示的楼层牌2秒",
                max_usage: 1,
            },
        }
    }
}

/// A player's skill slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillState {
    pub skill_type: SkillType,
    pub used: bool,
}

impl SkillState {
    pub fn granted(skill_type: SkillType) -> Self {
        Self {
            skill_type,
            used: false,
        }
    }

    pub fn can_use(&self) -> bool {
        self.skill_type == SkillType::ViewFloor && !self.used
    }
}

/// An open private viewing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillViewing {
    pub floor: u8,
    pub player_id: PlayerId,
    /// Seconds until the window closes.
    pub remaining: f32,
}

impl SkillViewing {
    pub fn is_viewing(&self, player_id: PlayerId, floor: u8) -> bool {
        self.player_id == player_id && self.floor == floor
    }

    /// Advance the window. Returns `true` once it has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillError {
    Unavailable,
    FloorNotViewable(u8),
}

impl std::fmt::Display for SkillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no usable skill"),
            Self::FloorNotViewable(floor) => {
                write!(f, "floor {floor} is not an unrevealed card")
            },
        }
    }
}

impl std::error::Error for SkillError {}

/// Spend `skill` on `floor`, opening a viewing window for `player_id`.
pub fn use_view_floor(
    skill: &mut SkillState,
    player_id: PlayerId,
    floor: u8,
    deck: &Deck,
) -> Result<SkillViewing, SkillError> {
    if !skill.can_use() {
        return Err(SkillError::Unavailable);
    }
    if !deck.card(floor).is_some_and(|c| !c.revealed) {
        return Err(SkillError::FloorNotViewable(floor));
    }
    skill.used = true;
    Ok(SkillViewing {
        floor,
        player_id,
        remaining: VIEW_FLOOR_SECS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn deck() -> Deck {
        Deck::generate(1, &mut StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn configs() {
        let none = SkillType::NoSkill.config();
        assert_eq!(none.name, "无技能");
        assert_eq!(none.max_usage, 0);
        let view = SkillType::ViewFloor.config();
        assert_eq!(view.icon, "🔮");
        assert_eq!(view.description, "临时查看一张未揭示的楼层牌2秒");
        assert_eq!(view.max_usage, 1);
    }

    #[test]
    fn can_use_only_unused_view_floor() {
        assert!(!SkillState::default().can_use());
        let mut s = SkillState::granted(SkillType::ViewFloor);
        assert!(s.can_use());
        s.used = true;
        assert!(!s.can_use());
    }

    #[test]
    fn view_floor_opens_window_once() {
        let deck = deck();
        let mut skill = SkillState::granted(SkillType::ViewFloor);
        let viewing = use_view_floor(&mut skill, 7, 4, &deck).unwrap();
        assert!(viewing.is_viewing(7, 4));
        assert!(!viewing.is_viewing(8, 4));
        assert!(skill.used);
        assert_eq!(
            use_view_floor(&mut skill, 7, 5, &deck),
            Err(SkillError::Unavailable)
        );
    }

    #[test]
    fn revealed_or_missing_floor_rejected() {
        let mut deck = deck();
        deck.reveal(2, 0).unwrap();
        let mut skill = SkillState::granted(SkillType::ViewFloor);
        assert_eq!(
            use_view_floor(&mut skill, 1, 2, &deck),
            Err(SkillError::FloorNotViewable(2))
        );
        assert_eq!(
            use_view_floor(&mut skill, 1, 9, &deck),
            Err(SkillError::FloorNotViewable(9))
        );
        assert!(!skill.used, "failed use must not consume the skill");
    }

    #[test]
    fn window_expires_after_two_seconds() {
        let mut v = SkillViewing {
            floor: 1,
            player_id: 1,
            remaining: VIEW_FLOOR_SECS,
        };
        assert!(!v.tick(1.0));
        assert!(!v.tick(0.75));
        assert!(v.tick(0.25));
    }
}
