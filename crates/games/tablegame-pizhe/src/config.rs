use serde::{Deserialize, Serialize};

use tablegame_core::config_schema::{ConfigField, ConfigSchema, ControlType, SelectOption};

/// Setting keys shared by the schema and the game.
pub mod keys {
    pub const TURN_TIME_LIMIT: &str = "turnTimeLimit";
    pub const VICTORY_SCORE: &str = "victoryScore";
    pub const ENABLE_PENALTY: &str = "enablePenalty";
    pub const DIFFICULTY: &str = "difficulty";
    pub const PLAYER_COUNT: &str = "playerCount";
    pub const BIG_FART_COUNT: &str = "bigFartCount";
}

/// Data-driven rules for PiZheXianZhi.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiZheRules {
    /// Big-fart cards dealt when the room settings don't say.
    pub default_big_fart_count: u8,
    /// Points for each member of the winning faction.
    pub win_points: i32,
    /// Length of a `ViewFloor` window in seconds.
    pub view_floor_secs: f32,
    /// Fixed deck seed. Random when unset.
    pub deck_seed: Option<u64>,
}

impl Default for PiZheRules {
    fn default() -> Self {
        Self {
            default_big_fart_count: 1,
            win_points: crate::scoring::WIN_POINTS,
            view_floor_secs: crate::skills::VIEW_FLOOR_SECS,
            deck_seed: None,
        }
    }
}

impl PiZheRules {
    /// Load rules from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("TABLEGAME_PIZHE_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(rules) => return rules,
                Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring malformed PiZhe rules"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/pizhe.toml")
            && let Ok(rules) = toml::from_str::<Self>(&contents)
        {
            return rules;
        }
        Self::default()
    }
}

/// Host-editable settings offered in the lobby.
pub fn settings_schema() -> ConfigSchema {
    ConfigSchema::new(vec![
        ConfigField::new(
            keys::TURN_TIME_LIMIT,
            ControlType::Select,
            "回合时间限制",
            "每位玩家思考和出牌的时间限制",
            60,
        )
        .with_options(vec![
            SelectOption::new(30, "30秒"),
            SelectOption::new(60, "60秒"),
            SelectOption::new(90, "90秒"),
            SelectOption::new(120, "120秒"),
            SelectOption::new(0, "无限制"),
        ])
        .with_range(0.0, 300.0),
        ConfigField::new(
            keys::VICTORY_SCORE,
            ControlType::Select,
            "胜利得分",
            "达到此分数即可获得胜利",
            150,
        )
        .with_options(vec![
            SelectOption::new(100, "100分"),
            SelectOption::new(150, "150分"),
            SelectOption::new(200, "200分"),
            SelectOption::new(300, "300分"),
        ])
        .with_range(50.0, 500.0),
        ConfigField::new(
            keys::ENABLE_PENALTY,
            ControlType::Switch,
            "启用惩罚卡",
            "开启后玩家答错会扣除分数",
            true,
        ),
        ConfigField::new(
            keys::DIFFICULTY,
            ControlType::Select,
            "难度等级",
            "影响题目的难度和得分倍数",
            "medium",
        )
        .with_options(vec![
            SelectOption::new("easy", "简单"),
            SelectOption::new("medium", "中等"),
            SelectOption::new("hard", "困难"),
        ]),
        ConfigField::new(
            keys::PLAYER_COUNT,
            ControlType::Select,
            "支持玩家数量",
            "游戏中支持的最大玩家数",
            4,
        )
        .with_options((3..=8).map(|n| SelectOption::new(n, format!("{n}人"))).collect())
        .with_range(3.0, 8.0),
        ConfigField::new(
            keys::BIG_FART_COUNT,
            ControlType::Select,
            "大屁牌数量",
            "场景牌中大屁牌的张数，其余有屁牌为小屁牌",
            1,
        )
        .with_options((0..=4).map(|n| SelectOption::new(n, format!("{n}张"))).collect())
        .with_range(0.0, 4.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_defaults() {
        let defaults = settings_schema().defaults();
        assert_eq!(defaults[keys::TURN_TIME_LIMIT], json!(60));
        assert_eq!(defaults[keys::VICTORY_SCORE], json!(150));
        assert_eq!(defaults[keys::ENABLE_PENALTY], json!(true));
        assert_eq!(defaults[keys::DIFFICULTY], json!("medium"));
        assert_eq!(defaults[keys::PLAYER_COUNT], json!(4));
        assert_eq!(defaults[keys::BIG_FART_COUNT], json!(1));
    }

    #[test]
    fn defaults_validate() {
        let schema = settings_schema();
        assert!(schema.validate(&schema.defaults()).is_ok());
    }

    #[test]
    fn range_rules() {
        let schema = settings_schema();
        for (key, bad) in [
            (keys::TURN_TIME_LIMIT, json!(301)),
            (keys::VICTORY_SCORE, json!(40)),
            (keys::PLAYER_COUNT, json!(9)),
            (keys::BIG_FART_COUNT, json!(5)),
        ] {
            let mut settings = schema.defaults();
            settings.insert(key.to_string(), bad);
            let errors = schema.validate(&settings).unwrap_err();
            assert_eq!(errors.len(), 1, "{key}");
            assert!(errors[0].ends_with("failed validation"));
        }
    }

    #[test]
    fn fractional_counts_rejected() {
        let schema = settings_schema();
        for key in [keys::BIG_FART_COUNT, keys::PLAYER_COUNT] {
            let mut settings = schema.defaults();
            settings.insert(key.to_string(), json!(2.5));
            assert!(schema.validate(&settings).is_err(), "{key}");
        }
    }

    #[test]
    fn player_count_options() {
        let schema = settings_schema();
        let field = schema.field(keys::PLAYER_COUNT).unwrap();
        assert_eq!(field.options.len(), 6);
        assert_eq!(field.options[0].label, "3人");
    }

    #[test]
    fn rules_parse_partial_toml() {
        let rules: PiZheRules = toml::from_str("win_points = 7\ndeck_seed = 42").unwrap();
        assert_eq!(rules.win_points, 7);
        assert_eq!(rules.deck_seed, Some(42));
        assert_eq!(rules.default_big_fart_count, 1);
    }
}
