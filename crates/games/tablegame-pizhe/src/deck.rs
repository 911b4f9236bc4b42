//! The 8-floor scenario deck: generation, reveal sequencing and integrity
//! checks.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cards::{CardCategory, CardType};

/// Number of floors (cards) in a deck.
pub const FLOOR_COUNT: u8 = 8;
/// No-fart cards in every deck.
pub const NO_FART_COUNT: u8 = 4;
/// Fart cards (small plus big) in every deck.
pub const TOTAL_FART_CARDS: u8 = 4;
/// Upper bound for the configurable big-fart count.
pub const MAX_BIG_FARTS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    InvalidBigFartCount(u8),
    InvalidFloor(u8),
    FloorMissing(u8),
    AlreadyRevealed(u8),
}

impl std::fmt::Display for DeckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBigFartCount(n) => {
                write!(f, "big fart count must be 0..={MAX_BIG_FARTS}, got {n}")
            },
            Self::InvalidFloor(n) => write!(f, "invalid floor {n}, expected 1..={FLOOR_COUNT}"),
            Self::FloorMissing(n) => write!(f, "floor {n} does not exist"),
            Self::AlreadyRevealed(n) => write!(f, "floor {n} has already been revealed"),
        }
    }
}

impl std::error::Error for DeckError {}

/// One card placed on a floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorCard {
    pub floor: u8,
    pub card_type: CardType,
    pub revealed: bool,
    /// Unix epoch milliseconds of the reveal.
    pub revealed_at: Option<u64>,
}

impl FloorCard {
    pub fn has_fart(&self) -> bool {
        self.card_type.has_fart()
    }
}

/// Cards ordered by floor; index `i` holds floor `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<FloorCard>,
}

impl Deck {
    /// Build a deck of 4 no-fart cards, `4 - big_fart_count` small farts and
    /// `big_fart_count` big farts of random type, shuffled onto floors 1..=8.
    pub fn generate<R: Rng>(big_fart_count: u8, rng: &mut R) -> Result<Self, DeckError> {
        if big_fart_count > MAX_BIG_FARTS {
            return Err(DeckError::InvalidBigFartCount(big_fart_count));
        }
        let small_fart_count = TOTAL_FART_CARDS - big_fart_count;

        let mut types = Vec::with_capacity(FLOOR_COUNT as usize);
        types.extend(std::iter::repeat_n(CardType::NoFart, NO_FART_COUNT as usize));
        types.extend(std::iter::repeat_n(
            CardType::SmallFart,
            small_fart_count as usize,
        ));
        for _ in 0..big_fart_count {
            let idx = rng.random_range(0..CardType::BIG_FARTS.len());
            types.push(CardType::BIG_FARTS[idx]);
        }
        types.shuffle(rng);

        tracing::debug!(big_fart_count, small_fart_count, "Generated scenario deck");

        let cards = types
            .into_iter()
            .zip(1..=FLOOR_COUNT)
            .map(|(card_type, floor)| FloorCard {
                floor,
                card_type,
                revealed: false,
                revealed_at: None,
            })
            .collect();
        Ok(Self { cards })
    }

    /// Build a deck from explicit card types, floor 1 first. Used for fixed
    /// scenarios; callers should `validate()` the result.
    pub fn from_types(types: &[CardType]) -> Self {
        let cards = types
            .iter()
            .zip(1u8..)
            .map(|(&card_type, floor)| FloorCard {
                floor,
                card_type,
                revealed: false,
                revealed_at: None,
            })
            .collect();
        Self { cards }
    }

    pub fn cards(&self) -> &[FloorCard] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, floor: u8) -> Option<&FloorCard> {
        self.cards.iter().find(|c| c.floor == floor)
    }

    /// Lowest floor whose card is still face down.
    pub fn next_floor_to_reveal(&self) -> Option<u8> {
        (1..=FLOOR_COUNT).find(|&floor| self.card(floor).is_some_and(|c| !c.revealed))
    }

    pub fn reveal(&mut self, floor: u8, now_ms: u64) -> Result<&FloorCard, DeckError> {
        if !(1..=FLOOR_COUNT).contains(&floor) {
            return Err(DeckError::InvalidFloor(floor));
        }
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.floor == floor)
            .ok_or(DeckError::FloorMissing(floor))?;
        if card.revealed {
            return Err(DeckError::AlreadyRevealed(floor));
        }
        card.revealed = true;
        card.revealed_at = Some(now_ms);
        Ok(card)
    }

    pub fn revealed_fart_count(&self) -> u8 {
        self.cards
            .iter()
            .filter(|c| c.revealed && c.has_fart())
            .count() as u8
    }

    /// Revealed cards in floor order.
    pub fn revealed_cards(&self) -> Vec<&FloorCard> {
        let mut revealed: Vec<_> = self.cards.iter().filter(|c| c.revealed).collect();
        revealed.sort_by_key(|c| c.floor);
        revealed
    }

    pub fn all_fart_cards_revealed(&self, total_fart_cards: u8) -> bool {
        self.revealed_fart_count() >= total_fart_cards
    }

    /// Count of cards per type.
    pub fn distribution(&self) -> BTreeMap<CardType, u8> {
        let mut stats = BTreeMap::new();
        for card in &self.cards {
            *stats.entry(card.card_type).or_insert(0) += 1;
        }
        stats
    }

    /// Integrity check. Every problem found is reported.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cards.len() != FLOOR_COUNT as usize {
            errors.push(format!(
                "deck has {} cards, expected {FLOOR_COUNT}",
                self.cards.len()
            ));
        }

        let mut floors: Vec<u8> = self.cards.iter().map(|c| c.floor).collect();
        floors.sort_unstable();
        if let Some(missing) = (1..=FLOOR_COUNT).find(|f| floors.binary_search(f).is_err()) {
            errors.push(format!("floors are not contiguous: floor {missing} missing"));
        }

        for (idx, card) in self.cards.iter().enumerate() {
            let expected = idx as u8 + 1;
            if card.floor != expected {
                errors.push(format!(
                    "position {expected} holds floor {} instead",
                    card.floor
                ));
            }
            if card.revealed != card.revealed_at.is_some() {
                errors.push(format!("floor {} has an inconsistent reveal time", card.floor));
            }
        }

        let no_fart = self
            .cards
            .iter()
            .filter(|c| c.card_type.category() == CardCategory::NoFart)
            .count();
        let fart = self.cards.len() - no_fart;
        if no_fart != NO_FART_COUNT as usize || fart != TOTAL_FART_CARDS as usize {
            errors.push(format!(
                "deck has {no_fart} no-fart and {fart} fart cards, expected \
                 {NO_FART_COUNT} and {TOTAL_FART_CARDS}"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
