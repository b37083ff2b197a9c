#![warn(clippy::all, missing_docs)]

//! Core domain logic for the MemHub client.
//!
//! This crate hosts the data models, configuration handling, backend API
//! client, shared application state, the matching-game engine, and the
//! high-score qualifier used by the terminal UI and any future frontends.

pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod scores;
pub mod store;

pub use api::{BackendClient, ImagePart};
pub use config::AppConfig;
pub use error::{ApiError, GameError};
pub use game::{
    DeckSize, Face, FlipOutcome, GameResult, GameSession, PairHalf, Phase, PlayCard,
};
pub use models::{CardCategory, CardPayload, HighScoreEntry, MemoryCard, UserProfile};
pub use scores::ScoreSubmission;
pub use store::AppStore;
