pub mod cards;
pub mod config;
pub mod deck;
pub mod identity;
pub mod scoring;
pub mod skills;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use tablegame_core::config_schema::ConfigSchema;
use tablegame_core::game_trait::{
    GameConfig, GameError, GameEvent, GameMetadata, PartyGame, PlayerId, PlayerScore,
};
use tablegame_core::party_game_state_codec;
use tablegame_core::player::Player;
use tablegame_core::time::now_millis;

use cards::CardDisplay;
use config::{PiZheRules, keys};
use deck::{Deck, MAX_BIG_FARTS, TOTAL_FART_CARDS};
use identity::{
    GameResult, Identity, MIN_PLAYERS, PlayerStatus, Seat, check_game_end,
    validate_identity_selection,
};
use skills::{SkillState, SkillType, SkillViewing, use_view_floor};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Players pick passenger or assassin; the host starts the reveal.
    SelectingIdentities,
    /// Floors are revealed one by one.
    Playing,
    Finished,
}

/// Actions a client may send, MessagePack encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PiZheAction {
    SelectIdentity { identity: Identity },
    /// Host: validate identities, deal the deck, start revealing.
    Begin,
    /// Host: reveal the lowest face-down floor.
    RevealNext,
    /// Host: mark a player as out.
    Eliminate { player_id: PlayerId },
    /// Host: final settlement once every fart card is face up.
    Settle,
    /// Assassin: peek at an unrevealed floor.
    UseSkill { floor: u8 },
}

/// Authoritative game state, including hidden information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiZheState {
    pub phase: Phase,
    pub host_id: PlayerId,
    pub seats: Vec<Seat>,
    pub deck: Deck,
    pub big_fart_count: u8,
    /// Next floor the host is expected to reveal.
    pub current_floor: u8,
    pub fart_cards_revealed: u8,
    pub skill_viewing: Option<SkillViewing>,
    pub result: Option<GameResult>,
}

impl Default for PiZheState {
    fn default() -> Self {
        Self {
            phase: Phase::SelectingIdentities,
            host_id: 0,
            seats: Vec::new(),
            deck: Deck::default(),
            big_fart_count: 1,
            current_floor: 1,
            fart_cards_revealed: 0,
            skill_viewing: None,
            result: None,
        }
    }
}

/// A seat as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub player_id: PlayerId,
    pub display_name: String,
    /// Only the owner sees their identity until the game is finished.
    pub identity: Option<Identity>,
    pub has_selected: bool,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub floor: u8,
    pub display: CardDisplay,
}

/// Per-player view sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiZheView {
    pub phase: Phase,
    pub host_id: PlayerId,
    pub viewer: PlayerId,
    pub seats: Vec<SeatView>,
    pub cards: Vec<CardView>,
    pub current_floor: u8,
    pub next_floor: Option<u8>,
    pub fart_cards_revealed: u8,
    pub big_fart_count: u8,
    pub selected_count: usize,
    /// The viewer's own skill, if seated.
    pub skill: Option<SkillState>,
    /// Seconds left on the viewer's own viewing window.
    pub viewing_remaining: Option<f32>,
    pub result: Option<GameResult>,
}

/// The PiZheXianZhi (屁者先知) social-deduction game.
pub struct PiZheXianZhi {
    state: PiZheState,
    rules: PiZheRules,
    rng: StdRng,
}

impl Default for PiZheXianZhi {
    fn default() -> Self {
        Self::new()
    }
}

impl PiZheXianZhi {
    pub fn new() -> Self {
        Self::with_rules(PiZheRules::load())
    }

    pub fn with_rules(rules: PiZheRules) -> Self {
        let rng = match rules.deck_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            state: PiZheState::default(),
            rules,
            rng,
        }
    }

    pub fn state(&self) -> &PiZheState {
        &self.state
    }

    fn seat(&self, id: PlayerId) -> Option<&Seat> {
        self.state.seats.iter().find(|s| s.player_id == id)
    }

    fn seat_mut(&mut self, id: PlayerId) -> Option<&mut Seat> {
        self.state.seats.iter_mut().find(|s| s.player_id == id)
    }

    fn require_host(&self, player_id: PlayerId, what: &str) -> Result<(), GameError> {
        if player_id == self.state.host_id {
            Ok(())
        } else {
            Err(GameError::NotPermitted(format!("only the host can {what}")))
        }
    }

    fn require_phase(&self, phase: Phase) -> Result<(), GameError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(GameError::InvalidPhase(format!(
                "expected {phase:?}, game is {:?}",
                self.state.phase
            )))
        }
    }

    fn select_identity(
        &mut self,
        player_id: PlayerId,
        identity: Identity,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_phase(Phase::SelectingIdentities)?;
        let seat = self.seat_mut(player_id).ok_or_else(|| {
            GameError::NotPermitted("only seated players pick an identity".to_string())
        })?;
        seat.select_identity(identity, now_millis());
        Ok(vec![GameEvent::StateChanged])
    }

    fn begin(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id, "start the reveal")?;
        self.require_phase(Phase::SelectingIdentities)?;
        validate_identity_selection(&self.state.seats)
            .map_err(|errors| GameError::InvalidAction(errors.join("; ")))?;

        let deck = Deck::generate(self.state.big_fart_count, &mut self.rng)
            .map_err(|e| GameError::InvalidConfig(e.to_string()))?;

        for seat in &mut self.state.seats {
            seat.skill = match seat.identity {
                Some(Identity::Assassin) => SkillState::granted(SkillType::ViewFloor),
                _ => SkillState::granted(SkillType::NoSkill),
            };
        }
        self.state.deck = deck;
        self.state.phase = Phase::Playing;
        self.state.current_floor = 1;
        self.state.fart_cards_revealed = 0;
        self.state.skill_viewing = None;

        tracing::info!(
            players = self.state.seats.len(),
            big_fart_count = self.state.big_fart_count,
            "Reveal phase started"
        );
        Ok(vec![GameEvent::StateChanged])
    }

    fn reveal_next(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id, "reveal floor cards")?;
        self.require_phase(Phase::Playing)?;
        let floor = self
            .state
            .deck
            .next_floor_to_reveal()
            .ok_or_else(|| GameError::InvalidAction("all floors have been revealed".into()))?;
        self.state
            .deck
            .reveal(floor, now_millis())
            .map_err(|e| GameError::InvalidAction(e.to_string()))?;

        self.state.current_floor = floor + 1;
        self.state.fart_cards_revealed = self.state.deck.revealed_fart_count();
        if self.state.skill_viewing.is_some_and(|v| v.floor == floor) {
            self.state.skill_viewing = None;
        }

        if self.state.deck.all_fart_cards_revealed(TOTAL_FART_CARDS) {
            tracing::debug!(floor, "All fart cards revealed, settlement available");
        }
        Ok(vec![GameEvent::StateChanged])
    }

    fn eliminate(
        &mut self,
        player_id: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id, "eliminate players")?;
        self.require_phase(Phase::Playing)?;
        let seat = self
            .seat_mut(target)
            .ok_or_else(|| GameError::InvalidAction("player does not exist".into()))?;
        if !seat.is_alive() {
            return Err(GameError::InvalidAction("player is already out".into()));
        }
        seat.eliminate(now_millis());

        let mut events = vec![
            GameEvent::PlayerEliminated { player_id: target },
            GameEvent::StateChanged,
        ];
        if let Some(result) = check_game_end(
            &self.state.seats,
            self.state.fart_cards_revealed,
            now_millis(),
        ) {
            events.extend(self.finish(result));
        }
        Ok(events)
    }

    fn settle(&mut self, player_id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        self.require_host(player_id, "settle the game")?;
        self.require_phase(Phase::Playing)?;
        let revealed = self.state.fart_cards_revealed;
        if revealed < TOTAL_FART_CARDS {
            return Err(GameError::InvalidAction(format!(
                "only {revealed} fart cards revealed, {} more needed",
                TOTAL_FART_CARDS - revealed
            )));
        }
        let result = check_game_end(&self.state.seats, revealed, now_millis())
            .ok_or_else(|| GameError::InvalidAction("settlement conditions not met".into()))?;
        let mut events = vec![GameEvent::StateChanged];
        events.extend(self.finish(result));
        Ok(events)
    }

    fn use_skill(&mut self, player_id: PlayerId, floor: u8) -> Result<Vec<GameEvent>, GameError> {
        self.require_phase(Phase::Playing)?;
        let deck = &self.state.deck;
        let seat = self
            .state
            .seats
            .iter_mut()
            .find(|s| s.player_id == player_id)
            .ok_or_else(|| GameError::NotPermitted("only seated players have skills".into()))?;
        let mut viewing = use_view_floor(&mut seat.skill, player_id, floor, deck)
            .map_err(|e| GameError::InvalidAction(e.to_string()))?;
        viewing.remaining = self.rules.view_floor_secs;
        self.state.skill_viewing = Some(viewing);
        tracing::debug!(player_id, floor, "Floor viewing window opened");
        Ok(vec![GameEvent::StateChanged])
    }

    fn finish(&mut self, result: GameResult) -> Vec<GameEvent> {
        let summary = format!("{} win: {}", result.winner.faction(), result.reason);
        tracing::info!(
            winner = result.winner.faction(),
            condition = result.condition.as_str(),
            "Game finished"
        );
        let scores = scoring::final_scores(&self.state.seats, &result, self.rules.win_points);
        self.state.result = Some(result);
        self.state.phase = Phase::Finished;
        self.state.skill_viewing = None;

        let mut events: Vec<GameEvent> = scores
            .into_iter()
            .map(|s| GameEvent::ScoreUpdate {
                player_id: s.player_id,
                score: s.score,
            })
            .collect();
        events.push(GameEvent::GameComplete { summary });
        events
    }

    /// Build the view for `viewer`. Unknown ids get the spectator view.
    pub fn view_for(&self, viewer: PlayerId) -> PiZheView {
        let state = &self.state;
        let finished = state.phase == Phase::Finished;
        let own_seat = self.seat(viewer);
        let is_host_or_assassin = viewer == state.host_id
            || own_seat.is_some_and(|s| s.identity == Some(Identity::Assassin));

        let seats = state
            .seats
            .iter()
            .map(|s| SeatView {
                player_id: s.player_id,
                display_name: s.display_name.clone(),
                identity: if finished || s.player_id == viewer {
                    s.identity
                } else {
                    None
                },
                has_selected: s.identity.is_some(),
                status: s.status,
            })
            .collect();

        let own_window = state.skill_viewing.filter(|v| v.player_id == viewer);
        let cards = state
            .deck
            .cards()
            .iter()
            .map(|c| CardView {
                floor: c.floor,
                display: CardDisplay::for_viewer(
                    c.card_type,
                    c.revealed || finished,
                    is_host_or_assassin,
                    own_window.is_some_and(|v| v.floor == c.floor),
                ),
            })
            .collect();

        PiZheView {
            phase: state.phase,
            host_id: state.host_id,
            viewer,
            seats,
            cards,
            current_floor: state.current_floor,
            next_floor: state.deck.next_floor_to_reveal(),
            fart_cards_revealed: state.fart_cards_revealed,
            big_fart_count: state.big_fart_count,
            selected_count: state.seats.iter().filter(|s| s.identity.is_some()).count(),
            skill: own_seat.map(|s| s.skill),
            viewing_remaining: own_window.map(|v| v.remaining.max(0.0)),
            result: state.result.clone(),
        }
    }
}

fn setting_u8(config: &GameConfig, key: &str) -> Result<Option<u8>, GameError> {
    match config.custom.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| GameError::InvalidConfig(format!("{key} must be a small integer"))),
    }
}

impl PartyGame for PiZheXianZhi {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "屁者先知".to_string(),
            icon: "🎯".to_string(),
            description: "一个有趣的推理游戏".to_string(),
            min_players: MIN_PLAYERS as u8,
            max_players: 8,
        }
    }

    fn config_schema(&self) -> ConfigSchema {
        config::settings_schema()
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) -> Result<(), GameError> {
        let big_fart_count = setting_u8(config, keys::BIG_FART_COUNT)?
            .unwrap_or(self.rules.default_big_fart_count);
        if big_fart_count > MAX_BIG_FARTS {
            return Err(GameError::InvalidConfig(format!(
                "bigFartCount must be 0..={MAX_BIG_FARTS}, got {big_fart_count}"
            )));
        }
        let cap = setting_u8(config, keys::PLAYER_COUNT)?
            .map_or(usize::MAX, usize::from);

        let seats: Vec<Seat> = players
            .iter()
            .filter(|p| !p.is_spectator)
            .take(cap)
            .map(|p| Seat::new(p.id, p.display_name.clone()))
            .collect();
        if seats.len() < MIN_PLAYERS {
            return Err(GameError::InvalidConfig(format!(
                "at least {MIN_PLAYERS} players required, got {}",
                seats.len()
            )));
        }

        self.state = PiZheState {
            host_id: config.host_id,
            seats,
            big_fart_count,
            ..PiZheState::default()
        };
        Ok(())
    }

    fn apply_action(
        &mut self,
        player_id: PlayerId,
        action: &[u8],
    ) -> Result<Vec<GameEvent>, GameError> {
        let action: PiZheAction =
            rmp_serde::from_slice(action).map_err(|e| GameError::Decode(e.to_string()))?;
        match action {
            PiZheAction::SelectIdentity { identity } => self.select_identity(player_id, identity),
            PiZheAction::Begin => self.begin(player_id),
            PiZheAction::RevealNext => self.reveal_next(player_id),
            PiZheAction::Eliminate { player_id: target } => self.eliminate(player_id, target),
            PiZheAction::Settle => self.settle(player_id),
            PiZheAction::UseSkill { floor } => self.use_skill(player_id, floor),
        }
    }

    fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        if let Some(viewing) = self.state.skill_viewing.as_mut()
            && viewing.tick(dt)
        {
            self.state.skill_viewing = None;
            return vec![GameEvent::StateChanged];
        }
        Vec::new()
    }

    party_game_state_codec!(state_type: PiZheState);

    fn serialize_view(&self, viewer: PlayerId) -> Vec<u8> {
        rmp_serde::to_vec(&self.view_for(viewer)).unwrap_or_default()
    }

    fn player_joined(&mut self, player: &Player) {
        tracing::debug!(player_id = player.id, "Spectator joined PiZhe session");
    }

    fn player_left(&mut self, player_id: PlayerId) -> Vec<GameEvent> {
        match self.state.phase {
            Phase::SelectingIdentities => {
                self.state.seats.retain(|s| s.player_id != player_id);
                vec![GameEvent::StateChanged]
            },
            Phase::Playing => {
                let now = now_millis();
                let Some(seat) = self.seat_mut(player_id) else {
                    return Vec::new();
                };
                if !seat.is_alive() {
                    return Vec::new();
                }
                seat.eliminate(now);
                let mut events = vec![GameEvent::PlayerEliminated { player_id }];
                if let Some(result) =
                    check_game_end(&self.state.seats, self.state.fart_cards_revealed, now)
                {
                    events.extend(self.finish(result));
                }
                events
            },
            Phase::Finished => Vec::new(),
        }
    }

    fn host_changed(&mut self, new_host: PlayerId) {
        self.state.host_id = new_host;
    }

    fn is_finished(&self) -> bool {
        self.state.phase == Phase::Finished
    }

    fn results(&self) -> Vec<PlayerScore> {
        match &self.state.result {
            Some(result) => scoring::final_scores(&self.state.seats, result, self.rules.win_points),
            None => self
                .state
                .seats
                .iter()
                .map(|s| PlayerScore {
                    player_id: s.player_id,
                    score: 0,
                })
                .collect(),
        }
    }
}
