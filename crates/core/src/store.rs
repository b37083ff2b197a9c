//! Shared application state.
//!
//! One [`AppStore`] instance is created at startup and handed (cheaply
//! cloned) to every consumer, replacing ad hoc prop threading. Refreshes
//! replace the cached collections wholesale; readers clone snapshots out.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::{
    api::BackendClient,
    error::ApiError,
    models::{MemoryCard, UserProfile},
};

/// Thread-safe container for session-wide state: the signed-in user, card
/// caches, and favorites.
#[derive(Debug, Clone)]
pub struct AppStore {
    client: BackendClient,
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    github_id: Option<String>,
    user: Option<UserProfile>,
    all_cards: Vec<MemoryCard>,
    active_cards: Vec<MemoryCard>,
    favorites: Vec<String>,
}

impl AppStore {
    /// Create an empty store backed by the given client.
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// The backend client this store refreshes through.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Re-fetch the session user and profile details.
    pub async fn refresh_user(&self) -> Result<(), ApiError> {
        let github_id = self.client.me().await?;
        let user = if github_id.is_some() {
            self.client.me_details().await?
        } else {
            None
        };
        let mut inner = self.inner.write();
        inner.github_id = github_id;
        inner.user = user;
        Ok(())
    }

    /// Re-fetch both card collections.
    pub async fn refresh_cards(&self) -> Result<(), ApiError> {
        let all = self.client.all_cards().await?;
        let active = self.client.active_cards(None).await?;
        let mut inner = self.inner.write();
        inner.all_cards = all;
        inner.active_cards = active;
        Ok(())
    }

    /// Re-fetch the favorites of the signed-in user.
    pub async fn refresh_favorites(&self) -> Result<(), ApiError> {
        let favorites = self.client.favorites().await?;
        let mut inner = self.inner.write();
        inner.favorites = favorites.into_iter().map(|card| card.id).collect();
        Ok(())
    }

    /// Toggle a card's favorite flag, returning whether it is now a
    /// favorite. The backend is updated first; the cache follows.
    pub async fn toggle_favorite(&self, card_id: &str) -> Result<bool, ApiError> {
        let was_favorite = self.is_favorite(card_id);
        if was_favorite {
            self.client.remove_favorite(card_id).await?;
        } else {
            self.client.add_favorite(card_id).await?;
        }

        let mut inner = self.inner.write();
        if was_favorite {
            inner.favorites.retain(|id| id != card_id);
        } else {
            inner.favorites.push(card_id.to_string());
        }
        Ok(!was_favorite)
    }

    /// Card detail lookup. Unknown ids yield the placeholder record
    /// instead of an error, so detail views always have something to show.
    pub async fn card_detail(&self, card_id: &str) -> Result<MemoryCard, ApiError> {
        match self.client.card_by_id(card_id).await {
            Ok(card) => Ok(card),
            Err(ApiError::NotFound) => {
                warn!(card_id, "card not found, rendering placeholder");
                Ok(MemoryCard::placeholder())
            }
            Err(err) => Err(err),
        }
    }

    /// GitHub id of the signed-in user, if any.
    pub fn github_id(&self) -> Option<String> {
        self.inner.read().github_id.clone()
    }

    /// Profile of the signed-in user, if any.
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.read().user.clone()
    }

    /// Whether a user is signed in.
    pub fn is_signed_in(&self) -> bool {
        self.inner.read().github_id.is_some()
    }

    /// Snapshot of every card.
    pub fn all_cards(&self) -> Vec<MemoryCard> {
        self.inner.read().all_cards.clone()
    }

    /// Snapshot of the active cards.
    pub fn active_cards(&self) -> Vec<MemoryCard> {
        self.inner.read().active_cards.clone()
    }

    /// Active cards belonging to one deck-group.
    pub fn active_cards_for_group(&self, match_id: u32) -> Vec<MemoryCard> {
        self.inner
            .read()
            .active_cards
            .iter()
            .filter(|card| card.match_id == match_id)
            .cloned()
            .collect()
    }

    /// Deck-groups that currently have active cards, ascending.
    pub fn deck_groups(&self) -> Vec<u32> {
        let inner = self.inner.read();
        let mut groups: Vec<u32> = inner.active_cards.iter().map(|card| card.match_id).collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// Favorite card ids of the signed-in user.
    pub fn favorites(&self) -> Vec<String> {
        self.inner.read().favorites.clone()
    }

    /// Whether the given card is currently a favorite.
    pub fn is_favorite(&self, card_id: &str) -> bool {
        self.inner.read().favorites.iter().any(|id| id == card_id)
    }

    #[cfg(test)]
    fn seed(&self, active: Vec<MemoryCard>, favorites: Vec<String>) {
        let mut inner = self.inner.write();
        inner.all_cards = active.clone();
        inner.active_cards = active;
        inner.favorites = favorites;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, models::CardCategory};

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

    fn store() -> AppStore {
        let client = BackendClient::new(&AppConfig::default()).unwrap();
        AppStore::new(client)
    }

    #[test]
    fn fresh_store_is_empty_and_anonymous() {
        let store = store();
        assert!(!store.is_signed_in());
        assert!(store.user().is_none());
        assert!(store.active_cards().is_empty());
        assert!(store.deck_groups().is_empty());
    }

    #[test]
    fn group_snapshot_and_deck_groups_follow_the_cache() {
        let store = store();
        store.seed(
            vec![card("a", 2), card("b", 1), card("c", 2), card("d", 7)],
            vec!["a".to_string()],
        );

        assert_eq!(store.deck_groups(), vec![1, 2, 7]);
        let group_two = store.active_cards_for_group(2);
        assert_eq!(group_two.len(), 2);
        assert!(group_two.iter().all(|card| card.match_id == 2));
        assert!(store.active_cards_for_group(9).is_empty());
    }

    #[test]
    fn favorites_are_queried_by_id() {
        let store = store();
        store.seed(vec![card("a", 1)], vec!["a".to_string()]);
        assert!(store.is_favorite("a"));
        assert!(!store.is_favorite("b"));
        assert_eq!(store.favorites(), vec!["a".to_string()]);
    }

    #[test]
    fn clones_share_the_same_state() {
        let store = store();
        let view = store.clone();
        store.seed(vec![card("a", 1)], Vec::new());
        assert_eq!(view.active_cards().len(), 1);
    }
}
