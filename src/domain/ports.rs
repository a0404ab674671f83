use crate::domain::model::{
    Card, CardContent, GenerationBatch, GenerationRequest, ReviewState, ScheduleState,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A stored card together with the version its next write must present.
#[derive(Debug, Clone)]
pub struct CardSnapshot {
    pub card: Card,
    pub version: u64,
}

/// Persistence collaborator. Every lookup and write is scoped to the owner;
/// writes carry the version read earlier and fail with `Conflict` when stale.
pub trait CardRepository: Send + Sync {
    fn insert_card(&self, card: Card) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// All-or-nothing: if any card is rejected, none of them are stored.
    fn insert_cards(
        &self,
        cards: Vec<Card>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn load_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
    ) -> impl std::future::Future<Output = Result<CardSnapshot>> + Send;

    fn list_cards(
        &self,
        owner_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<CardSnapshot>>> + Send;

    fn store_schedule(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        expected_version: u64,
        schedule: &ScheduleState,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Review state and any corrected content land in one write.
    fn store_review_state(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        expected_version: u64,
        review: &ReviewState,
        content: Option<&CardContent>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// One outbound generation call. Implementations must not retry and must
/// abandon the in-flight request once `cancel` fires or `deadline` passes.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<GenerationBatch>;
}
