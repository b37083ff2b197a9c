//! Deck construction for a play session.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::GameError, models::MemoryCard};

use super::shuffle::{shuffle_in_place, shuffled};

/// Supported board sizes, doubling as leaderboard buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckSize {
    /// 10 cards, 5 pairs.
    Small,
    /// 20 cards, 10 pairs.
    Medium,
    /// 32 cards, 16 pairs.
    Large,
}

impl DeckSize {
    /// All sizes in ascending order.
    pub const ALL: [DeckSize; 3] = [DeckSize::Small, DeckSize::Medium, DeckSize::Large];

    /// Total number of cards on the board.
    pub fn card_count(self) -> usize {
        match self {
            DeckSize::Small => 10,
            DeckSize::Medium => 20,
            DeckSize::Large => 32,
        }
    }

    /// Number of distinct cards the deck draws from the candidate set.
    pub fn pairs(self) -> usize {
        self.card_count() / 2
    }
}

impl TryFrom<usize> for DeckSize {
    type Error = usize;

    fn try_from(count: usize) -> Result<Self, usize> {
        match count {
            10 => Ok(DeckSize::Small),
            20 => Ok(DeckSize::Medium),
            32 => Ok(DeckSize::Large),
            other => Err(other),
        }
    }
}

impl fmt::Display for DeckSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cards", self.card_count())
    }
}

/// Which physical copy of a card a [`PlayCard`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairHalf {
    /// First copy.
    A,
    /// Second copy.
    B,
}

impl fmt::Display for PairHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairHalf::A => write!(f, "a"),
            PairHalf::B => write!(f, "b"),
        }
    }
}

/// Visibility of a single board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    /// Face down.
    Hidden,
    /// Face up, not yet resolved.
    Flipped,
    /// Paired up; terminal.
    Matched,
}

/// One physical card instance on the board. Every underlying
/// [`MemoryCard`] appears exactly twice per session, once per
/// [`PairHalf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayCard {
    /// Snapshot of the underlying card, shared by both halves.
    pub card: MemoryCard,
    /// Distinguishes the two physical copies.
    pub half: PairHalf,
    /// Current visibility.
    pub face: Face,
}

impl PlayCard {
    fn new(card: MemoryCard, half: PairHalf) -> Self {
        Self {
            card,
            half,
            face: Face::Hidden,
        }
    }

    /// Synthetic identifier unique per physical copy within a session.
    pub fn instance_id(&self) -> String {
        format!("{}:{}", self.card.id, self.half)
    }
}

fn check_supply(candidates: &[MemoryCard], size: DeckSize) -> Result<(), GameError> {
    let pairs = size.pairs();
    if candidates.len() < pairs {
        return Err(GameError::InsufficientCards {
            requested: size.card_count(),
            available: candidates.len(),
            missing: pairs - candidates.len(),
        });
    }
    Ok(())
}

/// Build a shuffled board of `size.card_count()` play cards from the given
/// candidate set (already filtered to one deck-group, active cards only).
///
/// Selection order is randomized before the cut so every candidate has an
/// equal chance of appearing; the doubled sequence is shuffled once more so
/// pair halves are not adjacent by construction.
pub fn build_deck(
    candidates: &[MemoryCard],
    size: DeckSize,
    rng: &mut impl Rng,
) -> Result<Vec<PlayCard>, GameError> {
    check_supply(candidates, size)?;

    let selected = shuffled(candidates, rng);
    let mut board: Vec<PlayCard> = selected
        .into_iter()
        .take(size.pairs())
        .flat_map(|card| {
            [
                PlayCard::new(card.clone(), PairHalf::A),
                PlayCard::new(card, PairHalf::B),
            ]
        })
        .collect();
    shuffle_in_place(&mut board, rng);
    Ok(board)
}

/// Build the pre-game preview: `size.pairs()` single cards in random order.
///
/// Purely informational; preview cards never enter a session and cannot
/// trigger win detection.
pub fn build_preview(
    candidates: &[MemoryCard],
    size: DeckSize,
    rng: &mut impl Rng,
) -> Result<Vec<MemoryCard>, GameError> {
    check_supply(candidates, size)?;

    let mut preview = shuffled(candidates, rng);
    preview.truncate(size.pairs());
    Ok(preview)
}
