//! The in-browser matching game, reimagined for the terminal: deck
//! construction, fair shuffling, and the flip/match session state machine.

pub mod deck;
pub mod session;
pub mod shuffle;

pub use deck::{build_deck, build_preview, DeckSize, Face, PairHalf, PlayCard};
pub use session::{FlipOutcome, GameResult, GameSession, Phase};
pub use shuffle::{shuffle_in_place, shuffled};
