//! Floor card catalog. Effect texts are shown to players as-is; they are
//! never evaluated.

use serde::{Deserialize, Serialize};

/// Every kind of floor card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardType {
    /// 无屁
    NoFart,
    /// 有屁
    SmallFart,
    /// 有连环屁
    ChainFart,
    /// 有蔫儿屁
    LimpFart,
    /// 有臭屁
    StinkyFart,
    /// 有彩虹屁
    RainbowFart,
    /// 有闷屁
    SilentFart,
}

/// Static data for one card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
    pub name: &'static str,
    pub has_fart: bool,
    pub is_big_fart: bool,
    pub effect: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

const NO_FART: CardInfo = CardInfo {
    name: "无屁",
    has_fart: false,
    is_big_fart: false,
    effect: "无效果",
    description: "这张牌没有任何效果",
    color: "#95a5a6",
};

const SMALL_FART: CardInfo = CardInfo {
    name: "有屁",
    has_fart: true,
    is_big_fart: false,
    effect: "对所有玩家造成1点伤害",
    description: "最基础的屁牌，对所有玩家造成少量伤害",
    color: "#f39c12",
};

const CHAIN_FART: CardInfo = CardInfo {
    name: "有连环屁",
    has_fart: true,
    is_big_fart: true,
    effect: "对所有玩家造成1点伤害，若上1张牌为小屁牌，则本次伤害+1，若下1张牌为小屁牌，则该小屁牌伤害+1（相邻牌需为小屁牌）",
    description: "具有连锁反应的屁牌，相邻的小屁牌会增强伤害",
    color: "#e74c3c",
};

const LIMP_FART: CardInfo = CardInfo {
    name: "有蔫儿屁",
    has_fart: true,
    is_big_fart: true,
    effect: "对所有玩家造成1点伤害，并使下1张无屁牌视为\"对所有玩家造成1点伤害\"的小屁牌。若4张无屁牌均已翻开，则本次伤害不可防御",
    description: "可以将无屁牌转化为小屁牌，具有隐藏威胁",
    color: "#9b59b6",
};

const STINKY_FART: CardInfo = CardInfo {
    name: "有臭屁",
    has_fart: true,
    is_big_fart: true,
    effect: "对所有玩家造成2点伤害",
    description: "威力强劲的屁牌，造成双倍伤害",
    color: "#c0392b",
};

const RAINBOW_FART: CardInfo = CardInfo {
    name: "有彩虹屁",
    has_fart: true,
    is_big_fart: true,
    effect: "对所有押牌玩家造成1点不可防御的伤害。对所有空押玩家造成2点伤害",
    description: "具有特殊效果的屁牌，在简化版本中造成全体伤害",
    color: "#3498db",
};

const SILENT_FART: CardInfo = CardInfo {
    name: "有闷屁",
    has_fart: true,
    is_big_fart: true,
    effect: "对所有玩家造成1点伤害，对所有空押玩家造成3点伤害",
    description: "具有额外效果的屁牌，在简化版本中造成全体伤害",
    color: "#34495e",
};

impl CardType {
    pub const ALL: [CardType; 7] = [
        CardType::NoFart,
        CardType::SmallFart,
        CardType::ChainFart,
        CardType::LimpFart,
        CardType::StinkyFart,
        CardType::RainbowFart,
        CardType::SilentFart,
    ];

    pub const BIG_FARTS: [CardType; 5] = [
        CardType::ChainFart,
        CardType::LimpFart,
        CardType::StinkyFart,
        CardType::RainbowFart,
        CardType::SilentFart,
    ];

    pub fn info(self) -> &'static CardInfo {
        match self {
            Self::NoFart => &NO_FART,
            Self::SmallFart => &SMALL_FART,
            Self::ChainFart => &CHAIN_FART,
            Self::LimpFart => &LIMP_FART,
            Self::StinkyFart => &STINKY_FART,
            Self::RainbowFart => &RAINBOW_FART,
            Self::SilentFart => &SILENT_FART,
        }
    }

    /// Parse a card's display name. `None` for names outside the catalog.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.info().name == name)
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn has_fart(self) -> bool {
        self.info().has_fart
    }

    pub fn is_big_fart(self) -> bool {
        self.info().is_big_fart
    }

    pub fn category(self) -> CardCategory {
        match self {
            Self::NoFart => CardCategory::NoFart,
            Self::SmallFart => CardCategory::SmallFart,
            _ => CardCategory::BigFart,
        }
    }
}

/// Coarse grouping used for styling and deck composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardCategory {
    NoFart,
    SmallFart,
    BigFart,
}

impl CardCategory {
    pub fn color(self) -> &'static str {
        match self {
            Self::NoFart => "#95a5a6",
            Self::SmallFart => "#f39c12",
            Self::BigFart => "#e74c3c",
        }
    }

    /// CSS-style class name for the revealed face.
    pub fn style(self) -> &'static str {
        match self {
            Self::NoFart => "no-fart",
            Self::SmallFart => "small-fart",
            Self::BigFart => "big-fart",
        }
    }
}

/// Placeholder shown for a card the viewer may not see.
pub const HIDDEN_CONTENT: &str = "████";
/// Placeholder shown to the host or an assassin for an unrevealed card.
pub const PRIVATE_CONTENT: &str = "隐藏";

/// How a single floor card appears to one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardDisplay {
    /// Unrevealed, viewer has no special access.
    Hidden { content: String },
    /// Unrevealed, viewer is the host or an assassin.
    Private { content: String },
    /// Unrevealed, shown to the viewer through an active skill window.
    Peeking { card_type: CardType, name: String },
    Revealed {
        card_type: CardType,
        name: String,
        effect: String,
        color: String,
        style: String,
        /// Big-fart cards open an effect popup when clicked.
        clickable: bool,
    },
}

impl CardDisplay {
    /// Build the display for a card given the viewer's access.
    pub fn for_viewer(
        card_type: CardType,
        revealed: bool,
        is_host_or_assassin: bool,
        is_skill_viewing: bool,
    ) -> Self {
        if revealed {
            let info = card_type.info();
            let category = card_type.category();
            return Self::Revealed {
                card_type,
                name: info.name.to_string(),
                effect: info.effect.to_string(),
                color: info.color.to_string(),
                style: category.style().to_string(),
                clickable: info.is_big_fart,
            };
        }
        if is_skill_viewing {
            return Self::Peeking {
                card_type,
                name: card_type.name().to_string(),
            };
        }
        if is_host_or_assassin {
            return Self::Private {
                content: PRIVATE_CONTENT.to_string(),
            };
        }
        Self::Hidden {
            content: HIDDEN_CONTENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_seven_types_five_big() {
        assert_eq!(CardType::ALL.len(), 7);
        let big: Vec<_> = CardType::ALL
            .into_iter()
            .filter(|t| t.has_fart() && t.is_big_fart())
            .collect();
        assert_eq!(big, CardType::BIG_FARTS.to_vec());
    }

    #[test]
    fn names_roundtrip() {
        for t in CardType::ALL {
            assert_eq!(CardType::from_name(t.name()), Some(t));
        }
        assert_eq!(CardType::from_name("有大屁"), None);
        assert_eq!(CardType::from_name(""), None);
    }

    #[test]
    fn no_fart_card_data() {
        let info = CardType::NoFart.info();
        assert_eq!(info.name, "无屁");
        assert!(!info.has_fart);
        assert_eq!(info.effect, "无效果");
        assert_eq!(info.color, "#95a5a6");
    }

    #[test]
    fn big_fart_colors() {
        assert_eq!(CardType::ChainFart.info().color, "#e74c3c");
        assert_eq!(CardType::LimpFart.info().color, "#9b59b6");
        assert_eq!(CardType::StinkyFart.info().color, "#c0392b");
        assert_eq!(CardType::RainbowFart.info().color, "#3498db");
        assert_eq!(CardType::SilentFart.info().color, "#34495e");
        assert_eq!(CardType::StinkyFart.info().effect, "对所有玩家造成2点伤害");
    }

    #[test]
    fn categories() {
        assert_eq!(CardType::NoFart.category(), CardCategory::NoFart);
        assert_eq!(CardType::SmallFart.category(), CardCategory::SmallFart);
        assert_eq!(CardType::RainbowFart.category(), CardCategory::BigFart);
        assert_eq!(CardCategory::SmallFart.color(), "#f39c12");
    }

    #[test]
    fn hidden_without_access() {
        let d = CardDisplay::for_viewer(CardType::StinkyFart, false, false, false);
        assert_eq!(
            d,
            CardDisplay::Hidden {
                content: "████".into()
            }
        );
    }

    #[test]
    fn private_for_host_or_assassin() {
        let d = CardDisplay::for_viewer(CardType::StinkyFart, false, true, false);
        assert_eq!(
            d,
            CardDisplay::Private {
                content: "隐藏".into()
            }
        );
    }

    #[test]
    fn skill_window_shows_card() {
        let d = CardDisplay::for_viewer(CardType::LimpFart, false, true, true);
        assert!(matches!(
            d,
            CardDisplay::Peeking {
                card_type: CardType::LimpFart,
                ..
            }
        ));
    }

    #[test]
    fn revealed_card_face() {
        match CardDisplay::for_viewer(CardType::SmallFart, true, false, false) {
            CardDisplay::Revealed {
                name,
                style,
                clickable,
                ..
            } => {
                assert_eq!(name, "有屁");
                assert_eq!(style, "small-fart");
                assert!(!clickable);
            },
            other => panic!("expected revealed, got {other:?}"),
        }
        match CardDisplay::for_viewer(CardType::ChainFart, true, false, false) {
            CardDisplay::Revealed {
                style, clickable, ..
            } => {
                assert_eq!(style, "big-fart");
                assert!(clickable);
            },
            other => panic!("expected revealed, got {other:?}"),
        }
    }
}
