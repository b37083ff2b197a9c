//! High-score qualification and submission packaging.
//!
//! The backend keeps at most [`LEADERBOARD_CAPACITY`] rows per card-count
//! bucket and evicts the slowest on insert; the client-side qualifier
//! mirrors that rule so players are only prompted for a name when the run
//! would actually earn a slot.

use serde::{Deserialize, Serialize};

use crate::{
    error::GameError,
    game::{DeckSize, GameResult},
    models::HighScoreEntry,
};

/// Rows the backend retains per bucket.
pub const LEADERBOARD_CAPACITY: usize = 10;

/// Minimum accepted player-name length after trimming.
pub const MIN_PLAYER_NAME_LEN: usize = 3;

/// Whether a finished run earns a slot in the given bucket.
///
/// A bucket below capacity accepts every run. A full bucket accepts a run
/// only when it is strictly faster than the current worst entry, i.e. when
/// it would displace that entry.
pub fn qualifies(entries: &[HighScoreEntry], score_time: f64) -> bool {
    if entries.len() < LEADERBOARD_CAPACITY {
        return true;
    }
    let worst = entries
        .iter()
        .map(|entry| entry.score_time)
        .fold(f64::NEG_INFINITY, f64::max);
    score_time < worst
}

/// Validate and normalize a player display name.
pub fn validate_player_name(name: &str) -> Result<String, GameError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_PLAYER_NAME_LEN {
        return Err(GameError::NameTooShort {
            min: MIN_PLAYER_NAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// Round a raw elapsed-seconds value to the one-decimal resolution the
/// leaderboard stores.
pub fn round_score(seconds: f64) -> f64 {
    (seconds * 10.0).round() / 10.0
}

/// Payload for a new leaderboard row.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub player_name: String,
    pub app_user_github_id: String,
    pub match_id: u32,
    pub number_of_cards: usize,
    pub score_time: f64,
}

impl ScoreSubmission {
    /// Package a completed session under a validated player name.
    pub fn from_result(result: &GameResult, player_name: String, github_id: String) -> Self {
        Self {
            player_name,
            app_user_github_id: github_id,
            match_id: result.match_id,
            number_of_cards: result.size.card_count(),
            score_time: result.score_time(),
        }
    }

    /// The bucket this submission lands in.
    pub fn bucket(&self) -> Option<DeckSize> {
        DeckSize::try_from(self.number_of_cards).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn entry(score_time: f64) -> HighScoreEntry {
        HighScoreEntry {
            id: format!("hs-{score_time}"),
            player_name: "Player".to_string(),
            app_user_github_id: "1".to_string(),
            match_id: 1,
            number_of_cards: 10,
            score_time,
            date: NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    fn full_bucket() -> Vec<HighScoreEntry> {
        (1..=10).map(|i| entry(i as f64)).collect()
    }

    #[test]
    fn short_buckets_always_qualify() {
        assert!(qualifies(&[], 9_999.0));
        let nine: Vec<HighScoreEntry> = (1..=9).map(|i| entry(i as f64)).collect();
        assert!(qualifies(&nine, 9_999.0));
    }

    #[test]
    fn full_bucket_requires_strictly_beating_the_worst() {
        let bucket = full_bucket();
        assert!(qualifies(&bucket, 9.9));
        assert!(!qualifies(&bucket, 10.0), "equal to the worst must not qualify");
        assert!(!qualifies(&bucket, 10.1));
    }

    #[test]
    fn bucket_order_does_not_matter() {
        let mut bucket = full_bucket();
        bucket.reverse();
        assert!(qualifies(&bucket, 9.9));
        assert!(!qualifies(&bucket, 10.0));
    }

    #[test]
    fn player_names_are_trimmed_and_length_checked() {
        assert_eq!(validate_player_name("  Ada  ").unwrap(), "Ada");
        assert_eq!(
            validate_player_name("ab"),
            Err(GameError::NameTooShort { min: 3 })
        );
        // whitespace padding cannot satisfy the minimum
        assert_eq!(
            validate_player_name("  a   "),
            Err(GameError::NameTooShort { min: 3 })
        );
    }

    #[test]
    fn rounding_matches_the_leaderboard_resolution() {
        assert!((round_score(23.449) - 23.4).abs() < f64::EPSILON);
        assert!((round_score(23.45) - 23.5).abs() < f64::EPSILON);
        assert!((round_score(0.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn submission_packages_the_session_result() {
        let result = GameResult {
            match_id: 4,
            size: DeckSize::Medium,
            elapsed: Duration::from_millis(61_240),
        };
        let submission =
            ScoreSubmission::from_result(&result, "Ada".to_string(), "42".to_string());

        assert_eq!(submission.match_id, 4);
        assert_eq!(submission.number_of_cards, 20);
        assert!((submission.score_time - 61.2).abs() < f64::EPSILON);
        assert_eq!(submission.bucket(), Some(DeckSize::Medium));

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["playerName"], "Ada");
        assert_eq!(value["numberOfCards"], 20);
    }
}
