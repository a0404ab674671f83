use crate::domain::model::{Card, CardContent, ReviewState, ScheduleState};
use crate::domain::ports::{CardRepository, CardSnapshot};
use crate::utils::error::{CardError, Result};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredCard {
    card: Card,
    version: u64,
}

/// Process-local card store with per-card optimistic versioning.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCardStore {
    cards: Arc<Mutex<HashMap<Uuid, StoredCard>>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.cards.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.lock().await.is_empty()
    }

    /// Applies `update` if the card belongs to `owner_id` and `expected_version`
    /// is current; returns the new version.
    async fn write<F>(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        expected_version: u64,
        update: F,
    ) -> Result<u64>
    where
        F: FnOnce(&mut Card),
    {
        let mut cards = self.cards.lock().await;
        let stored = cards
            .get_mut(&card_id)
            .filter(|stored| stored.card.owner_id == owner_id)
            .ok_or(CardError::NotFound { card_id })?;

        if stored.version != expected_version {
            return Err(CardError::Conflict {
                card_id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        update(&mut stored.card);
        stored.card.updated_at = Utc::now();
        stored.version += 1;
        Ok(stored.version)
    }
}

impl CardRepository for InMemoryCardStore {
    async fn insert_card(&self, card: Card) -> Result<u64> {
        let mut cards = self.cards.lock().await;
        if cards.contains_key(&card.id) {
            return Err(CardError::validation(format!(
                "card {} already exists",
                card.id
            )));
        }
        cards.insert(card.id, StoredCard { card, version: 1 });
        Ok(1)
    }

    async fn insert_cards(&self, batch: Vec<Card>) -> Result<()> {
        let mut cards = self.cards.lock().await;
        let mut seen = HashSet::with_capacity(batch.len());
        if let Some(card) = batch
            .iter()
            .find(|card| cards.contains_key(&card.id) || !seen.insert(card.id))
        {
            return Err(CardError::validation(format!(
                "card {} already exists",
                card.id
            )));
        }
        for card in batch {
            cards.insert(card.id, StoredCard { card, version: 1 });
        }
        Ok(())
    }

    async fn load_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<CardSnapshot> {
        let cards = self.cards.lock().await;
        cards
            .get(&card_id)
            .filter(|stored| stored.card.owner_id == owner_id)
            .map(|stored| CardSnapshot {
                card: stored.card.clone(),
                version: stored.version,
            })
            .ok_or(CardError::NotFound { card_id })
    }

    async fn list_cards(&self, owner_id: Uuid) -> Result<Vec<CardSnapshot>> {
        let cards = self.cards.lock().await;
        Ok(cards
            .values()
            .filter(|stored| stored.card.owner_id == owner_id)
            .map(|stored| CardSnapshot {
                card: stored.card.clone(),
                version: stored.version,
            })
            .collect())
    }

    async fn store_schedule(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        expected_version: u64,
        schedule: &ScheduleState,
    ) -> Result<u64> {
        let schedule = schedule.clone();
        self.write(owner_id, card_id, expected_version, move |card| {
            card.schedule = schedule;
        })
        .await
    }

    async fn store_review_state(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        expected_version: u64,
        review: &ReviewState,
        content: Option<&CardContent>,
    ) -> Result<u64> {
        let review = *review;
        let content = content.cloned();
        self.write(owner_id, card_id, expected_version, move |card| {
            card.review = review;
            if let Some(content) = content {
                card.content = content;
            }
        })
        .await
    }
}
