//! Error taxonomy for game setup and backend access.

use reqwest::StatusCode;
use thiserror::Error;

/// Local, recoverable game errors. None of these abort the application;
/// the frontend surfaces them as advisory messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The chosen deck-group does not hold enough active cards for the
    /// requested deck size.
    #[error(
        "{missing} more active card(s) needed in this group ({available} available, {requested} requested)"
    )]
    InsufficientCards {
        /// Cards the deck would contain (pair count times two).
        requested: usize,
        /// Distinct active cards available in the chosen group.
        available: usize,
        /// Additional distinct cards required before the deck can be dealt.
        missing: usize,
    },

    /// Player name rejected during high-score submission.
    #[error("player name must be at least {min} characters")]
    NameTooShort {
        /// Minimum accepted length after trimming.
        min: usize,
    },
}

/// Failures talking to the backend collaborator.
///
/// All variants are caught at the call site and surfaced as UI feedback;
/// they never roll back local game state.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested resource does not exist (HTTP 404).
    #[error("resource not found")]
    NotFound,

    /// Any other non-success response.
    #[error("backend returned status {status}")]
    Status {
        /// HTTP status code reported by the backend.
        status: StatusCode,
    },

    /// Connection, timeout, or protocol failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A request payload could not be encoded.
    #[error("failed to encode request payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ApiError {
    /// Map a non-success status to the matching variant.
    pub(crate) fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            ApiError::NotFound
        } else {
            ApiError::Status { status }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_cards_names_the_shortfall() {
        let err = GameError::InsufficientCards {
            requested: 10,
            available: 3,
            missing: 2,
        };
        let message = err.to_string();
        assert!(message.contains("2 more active card(s)"), "got: {message}");
        assert!(message.contains("3 available"));
        assert!(message.contains("10 requested"));
    }

    #[test]
    fn not_found_maps_from_404() {
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND),
            ApiError::NotFound
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Status { .. }
        ));
    }
}
