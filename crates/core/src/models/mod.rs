//! Shared domain models mirroring the MemoryHub backend wire formats.

#![allow(missing_docs)]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Source of a card's artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardCategory {
    /// Image uploaded by the owner and hosted on the image CDN.
    CloudinaryImage,
    /// The owner's GitHub avatar reused as card artwork.
    GithubAvatar,
}

/// One collectible card as served by the backend.
///
/// The `id` is assigned by the backend and immutable afterwards; `match_id`
/// groups cards into playable decks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCard {
    pub id: String,
    pub name: String,
    pub match_id: u32,
    pub category: CardCategory,
    pub description: String,
    pub is_active: bool,
    pub app_user_github_id: String,
    pub app_user_username: String,
    pub app_user_avatar_url: String,
    pub app_user_github_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl MemoryCard {
    /// Default record rendered when a card lookup comes back empty.
    pub fn placeholder() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            match_id: 0,
            category: CardCategory::CloudinaryImage,
            description: String::new(),
            is_active: true,
            app_user_github_id: String::new(),
            app_user_username: String::new(),
            app_user_avatar_url: String::new(),
            app_user_github_url: String::new(),
            image_url: None,
        }
    }
}

/// Request body for card create/update calls.
///
/// Identical to [`MemoryCard`] minus the backend-assigned `id`; sent as the
/// `memoryModelDto` JSON part of the multipart upload, or as a plain JSON
/// body for avatar cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub name: String,
    pub match_id: u32,
    pub category: CardCategory,
    pub description: String,
    pub is_active: bool,
    pub app_user_github_id: String,
    pub app_user_username: String,
    pub app_user_avatar_url: String,
    pub app_user_github_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&MemoryCard> for CardPayload {
    fn from(card: &MemoryCard) -> Self {
        Self {
            name: card.name.clone(),
            match_id: card.match_id,
            category: card.category,
            description: card.description.clone(),
            is_active: card.is_active,
            app_user_github_id: card.app_user_github_id.clone(),
            app_user_username: card.app_user_username.clone(),
            app_user_avatar_url: card.app_user_avatar_url.clone(),
            app_user_github_url: card.app_user_github_url.clone(),
            image_url: card.image_url.clone(),
        }
    }
}

/// One leaderboard row, owned by the backend.
///
/// `date` arrives without a timezone (backend local time), hence the naive
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreEntry {
    pub id: String,
    pub player_name: String,
    pub app_user_github_id: String,
    pub match_id: u32,
    pub number_of_cards: usize,
    pub score_time: f64,
    pub date: NaiveDateTime,
}

/// Profile details for the signed-in user, as relayed from the identity
/// provider. Only the attributes the frontend displays are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub avatar_url: String,
    pub html_url: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub followers: Option<u32>,
    #[serde(default)]
    pub public_repos: Option<u32>,
}

impl UserProfile {
    /// User-facing label, preferring the display name over the login.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_round_trips_camel_case_wire_format() {
        let raw = json!({
            "id": "abc123",
            "name": "Ada",
            "matchId": 3,
            "category": "CLOUDINARY_IMAGE",
            "description": "a portrait",
            "isActive": true,
            "appUserGithubId": "42",
            "appUserUsername": "ada",
            "appUserAvatarUrl": "https://avatars.example/42",
            "appUserGithubUrl": "https://github.com/ada",
            "imageUrl": "https://images.example/ada.png"
        });

        let card: MemoryCard = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(card.match_id, 3);
        assert_eq!(card.category, CardCategory::CloudinaryImage);
        assert_eq!(
            card.image_url.as_deref(),
            Some("https://images.example/ada.png")
        );

        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn card_tolerates_missing_image_url() {
        let raw = json!({
            "id": "abc123",
            "name": "Ada",
            "matchId": 3,
            "category": "GITHUB_AVATAR",
            "description": "",
            "isActive": false,
            "appUserGithubId": "42",
            "appUserUsername": "ada",
            "appUserAvatarUrl": "",
            "appUserGithubUrl": ""
        });

        let card: MemoryCard = serde_json::from_value(raw).unwrap();
        assert!(card.image_url.is_none());
        assert!(!card.is_active);
    }

    #[test]
    fn high_score_parses_backend_timestamp() {
        let raw = json!({
            "id": "hs1",
            "playerName": "Eve",
            "appUserGithubId": "7",
            "matchId": 1,
            "numberOfCards": 10,
            "scoreTime": 23.4,
            "date": "2025-04-01T10:15:30"
        });

        let entry: HighScoreEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.number_of_cards, 10);
        assert!((entry.score_time - 23.4).abs() < f64::EPSILON);
        assert_eq!(entry.date.format("%Y-%m-%d").to_string(), "2025-04-01");
    }

    #[test]
    fn profile_display_name_falls_back_to_login() {
        let profile = UserProfile {
            login: "ada".to_string(),
            id: 42,
            name: None,
            avatar_url: String::new(),
            html_url: String::new(),
            bio: None,
            location: None,
            company: None,
            followers: None,
            public_repos: None,
        };
        assert_eq!(profile.display_name(), "ada");
    }

    #[test]
    fn payload_from_card_drops_the_id() {
        let card = MemoryCard {
            id: "abc".to_string(),
            name: "Ada".to_string(),
            match_id: 5,
            category: CardCategory::GithubAvatar,
            description: String::new(),
            is_active: true,
            app_user_github_id: "42".to_string(),
            app_user_username: "ada".to_string(),
            app_user_avatar_url: String::new(),
            app_user_github_url: String::new(),
            image_url: None,
        };

        let payload = CardPayload::from(&card);
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["matchId"], 5);
    }
}
