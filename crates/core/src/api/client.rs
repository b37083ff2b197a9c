//! Thin typed wrapper over the backend's REST endpoints.
//!
//! Every method maps to one documented endpoint; the backend's internals
//! are a black box. Card create/update carry the structured fields as a
//! JSON `memoryModelDto` part next to an optional `image` part; everything
//! else is plain JSON.

use reqwest::{
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::AppConfig,
    error::ApiError,
    game::DeckSize,
    models::{CardPayload, HighScoreEntry, MemoryCard, UserProfile},
    scores::ScoreSubmission,
};

/// An image to attach to a card create/update call.
#[derive(Debug, Clone)]
pub struct ImagePart {
    /// File name reported to the backend.
    pub file_name: String,
    /// MIME type of the image data.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

/// Client for the MemoryHub REST backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// All cards, active or not.
    pub async fn all_cards(&self) -> Result<Vec<MemoryCard>, ApiError> {
        let response = self.http.get(self.url("/api/memory-hub")).send().await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Active cards, optionally narrowed to one deck-group.
    pub async fn active_cards(&self, group: Option<u32>) -> Result<Vec<MemoryCard>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/memory-hub/active"))
            .send()
            .await?;
        let cards: Vec<MemoryCard> = checked(response).await?.json().await?;
        Ok(filter_by_group(cards, group))
    }

    /// Distinct deck-group identifiers that currently have active cards.
    pub async fn deck_groups(&self) -> Result<Vec<u32>, ApiError> {
        let cards = self.active_cards(None).await?;
        Ok(distinct_groups(&cards))
    }

    /// Single card lookup; yields [`ApiError::NotFound`] for unknown ids.
    pub async fn card_by_id(&self, id: &str) -> Result<MemoryCard, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/memory-hub/{id}")))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Create a card, uploading the image alongside the structured fields.
    pub async fn create_card(
        &self,
        payload: &CardPayload,
        image: Option<ImagePart>,
    ) -> Result<MemoryCard, ApiError> {
        let form = card_form(payload, image)?;
        let response = self
            .http
            .post(self.url("/api/memory-hub"))
            .multipart(form)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Create a card that reuses the owner's avatar as artwork (no upload).
    pub async fn create_avatar_card(&self, payload: &CardPayload) -> Result<MemoryCard, ApiError> {
        let response = self
            .http
            .post(self.url("/api/memory-hub/avatar"))
            .json(payload)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Update a card; a new image replaces the stored one.
    pub async fn update_card(
        &self,
        id: &str,
        payload: &CardPayload,
        image: Option<ImagePart>,
    ) -> Result<MemoryCard, ApiError> {
        let form = card_form(payload, image)?;
        let response = self
            .http
            .put(self.url(&format!("/api/memory-hub/{id}")))
            .multipart(form)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Update an avatar card (plain JSON, no image part).
    pub async fn update_avatar_card(
        &self,
        id: &str,
        payload: &CardPayload,
    ) -> Result<MemoryCard, ApiError> {
        let response = self
            .http
            .put(self.url(&format!("/api/memory-hub/avatar/{id}")))
            .json(payload)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Delete a card.
    pub async fn delete_card(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/memory-hub/{id}")))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Toggle a card's active flag, returning the updated record.
    pub async fn toggle_active(&self, id: &str) -> Result<MemoryCard, ApiError> {
        let response = self
            .http
            .put(self.url(&format!("/api/memory-hub/{id}/toggle-active")))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// GitHub id of the signed-in user, `None` when anonymous.
    pub async fn me(&self) -> Result<Option<String>, ApiError> {
        let response = self.http.get(self.url("/api/users/me")).send().await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(None);
        }
        let text = checked(response).await?.text().await?;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "anonymousUser" {
            return Ok(None);
        }
        Ok(Some(trimmed.to_string()))
    }

    /// Extended profile of the signed-in user, `None` when anonymous.
    pub async fn me_details(&self) -> Result<Option<UserProfile>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/users/me/details"))
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let value: Value = checked(response).await?.json().await?;
        // an unauthenticated session answers with an advisory message
        // instead of provider attributes
        if value.get("login").is_none() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Cards owned by the given GitHub user.
    pub async fn my_cards(&self, github_id: &str) -> Result<Vec<MemoryCard>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/users/me/my-memories/{github_id}")))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Favorite cards of the signed-in user.
    pub async fn favorites(&self) -> Result<Vec<MemoryCard>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/memory-hub/favorites"))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Mark a card as favorite.
    pub async fn add_favorite(&self, card_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/api/memory-hub/favorites/{card_id}")))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Remove a card from the favorites.
    pub async fn remove_favorite(&self, card_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/memory-hub/favorites/{card_id}")))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Leaderboard rows for one card-count bucket, fastest first.
    pub async fn high_scores(&self, bucket: DeckSize) -> Result<Vec<HighScoreEntry>, ApiError> {
        let response = self.http.get(self.url("/api/high-score")).send().await?;
        let entries: Vec<HighScoreEntry> = checked(response).await?.json().await?;
        Ok(bucket_scores(entries, bucket))
    }

    /// Publish a qualifying run.
    pub async fn submit_high_score(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<HighScoreEntry, ApiError> {
        debug!(
            match_id = submission.match_id,
            bucket = submission.number_of_cards,
            score_time = submission.score_time,
            "submitting high score"
        );
        let response = self
            .http
            .post(self.url("/api/high-score"))
            .json(submission)
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Browser URL that starts the delegated GitHub login.
    pub fn login_url(&self) -> String {
        self.url("/oauth2/authorization/github")
    }

    /// Invalidate the backend session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.http.post(self.url("/logout")).send().await?;
        checked(response).await?;
        Ok(())
    }
}

async fn checked(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_status(status))
    }
}

fn card_form(payload: &CardPayload, image: Option<ImagePart>) -> Result<Form, ApiError> {
    let json = serde_json::to_string(payload)?;
    let dto = Part::text(json).mime_str("application/json")?;
    let mut form = Form::new().part("memoryModelDto", dto);
    if let Some(image) = image {
        form = form.part(
            "image",
            Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?,
        );
    }
    Ok(form)
}

fn filter_by_group(cards: Vec<MemoryCard>, group: Option<u32>) -> Vec<MemoryCard> {
    match group {
        Some(match_id) => cards
            .into_iter()
            .filter(|card| card.match_id == match_id)
            .collect(),
        None => cards,
    }
}

fn distinct_groups(cards: &[MemoryCard]) -> Vec<u32> {
    let mut groups: Vec<u32> = cards.iter().map(|card| card.match_id).collect();
    groups.sort_unstable();
    groups.dedup();
    groups
}

fn bucket_scores(mut entries: Vec<HighScoreEntry>, bucket: DeckSize) -> Vec<HighScoreEntry> {
    entries.retain(|entry| entry.number_of_cards == bucket.card_count());
    entries.sort_by(|a, b| {
        a.score_time
            .partial_cmp(&b.score_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardCategory;
    use chrono::NaiveDate;

    fn card(id: &str, match_id: u32) -> MemoryCard {
        MemoryCard {
            id: id.to_string(),
            name: id.to_string(),
            match_id,
            category: CardCategory::CloudinaryImage,
            description: String::new(),
            is_active: true,
            app_user_github_id: "1".to_string(),
            app_user_username: "tester".to_string(),
            app_user_avatar_url: String::new(),
            app_user_github_url: String::new(),
            image_url: None,
        }
    }

    fn entry(number_of_cards: usize, score_time: f64) -> HighScoreEntry {
        HighScoreEntry {
            id: format!("hs-{number_of_cards}-{score_time}"),
            player_name: "Player".to_string(),
            app_user_github_id: "1".to_string(),
            match_id: 1,
            number_of_cards,
            score_time,
            date: NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    fn client() -> BackendClient {
        BackendClient::new(&AppConfig {
            backend_url: "https://hub.example/".to_string(),
            ..AppConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let client = client();
        assert_eq!(
            client.url("/api/memory-hub/active"),
            "https://hub.example/api/memory-hub/active"
        );
        assert_eq!(
            client.login_url(),
            "https://hub.example/oauth2/authorization/github"
        );
    }

    #[test]
    fn group_filter_keeps_only_the_requested_group() {
        let cards = vec![card("a", 1), card("b", 2), card("c", 1)];
        let filtered = filter_by_group(cards.clone(), Some(1));
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|card| card.match_id == 1));
        assert_eq!(filter_by_group(cards, None).len(), 3);
    }

    #[test]
    fn distinct_groups_are_sorted_and_deduplicated() {
        let cards = vec![card("a", 5), card("b", 2), card("c", 5), card("d", 1)];
        assert_eq!(distinct_groups(&cards), vec![1, 2, 5]);
    }

    #[test]
    fn bucket_scores_partition_and_sort_ascending() {
        let entries = vec![
            entry(10, 30.0),
            entry(20, 12.5),
            entry(10, 12.0),
            entry(32, 99.0),
            entry(10, 21.7),
        ];
        let bucket = bucket_scores(entries, DeckSize::Small);
        assert_eq!(bucket.len(), 3);
        let times: Vec<f64> = bucket.iter().map(|entry| entry.score_time).collect();
        assert_eq!(times, vec![12.0, 21.7, 30.0]);
    }

    #[test]
    fn card_form_accepts_payload_with_and_without_image() {
        let payload = CardPayload::from(&card("a", 1));
        assert!(card_form(&payload, None).is_ok());
        let image = ImagePart {
            file_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0u8; 16],
        };
        assert!(card_form(&payload, Some(image)).is_ok());
    }
}
